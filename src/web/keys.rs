// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWKS publication
//!
//! Platforms verify the tool's client assertions against this
//! document. Only public halves ever appear here.

use rocket::serde::json::Json;
use rocket::{get, State};

use super::error::ApiError;
use super::state::LtiState;
use crate::auth::JwksDocument;

#[get("/keys")]
pub async fn keys(state: &State<LtiState>) -> Result<Json<JwksDocument>, ApiError> {
    Ok(Json(state.keys.public_jwks()?))
}
