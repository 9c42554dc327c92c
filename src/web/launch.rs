// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Launch endpoints
//!
//! The platform posts the signed ID token and the state here. Both
//! gates must pass: the token is validated against the platform's
//! published keys (with nonce consumption), then the state cookie is
//! consumed and its issuer compared with the token's. The consumed
//! nonce and cookie are not restored if a later step fails.
//!
//! On success the validated claims are persisted for the session and
//! the browser is redirected into the tool with a fresh tool token as
//! query credential.

use log::info;
use rocket::form::{Errors, Form};
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::{post, FromForm, State};
use url::Url;

use super::error::ApiError;
use super::state::LtiState;
use crate::auth::launch_state::LaunchStateGuard;
use crate::auth::{AuthError, IdTokenClaims};

/// Body of a launch post from the platform.
#[derive(Debug, FromForm)]
pub struct LaunchRequest {
    pub id_token: String,
    pub state: String,
}

#[post("/launch", data = "<body>")]
pub async fn launch(
    body: Result<Form<LaunchRequest>, Errors<'_>>,
    cookies: &CookieJar<'_>,
    state: &State<LtiState>,
) -> Result<Redirect, ApiError> {
    let body = parse_body(body)?;
    let claims = validate_launch(&body, cookies, state).await?;

    let resource_id = claims
        .resource_id()
        .ok_or_else(|| AuthError::Validation("Resource ID not found".to_string()))?;

    state.id_tokens.save(&claims)?;
    let tool_token = state.tool_tokens.issue_for(&claims)?;

    info!(
        "Launch accepted for user {} from {} (deployment {})",
        claims.sub, claims.iss, claims.deployment_id
    );
    redirect_with_token(state, &format!("resources/{}", resource_id), &tool_token)
}

#[post("/deep-link-launch", data = "<body>")]
pub async fn deep_link_launch(
    body: Result<Form<LaunchRequest>, Errors<'_>>,
    cookies: &CookieJar<'_>,
    state: &State<LtiState>,
) -> Result<Redirect, ApiError> {
    let body = parse_body(body)?;
    let claims = validate_launch(&body, cookies, state).await?;

    state.id_tokens.save(&claims)?;
    let tool_token = state.tool_tokens.issue_for(&claims)?;

    info!(
        "Deep-link launch accepted for user {} from {}",
        claims.sub, claims.iss
    );
    redirect_with_token(state, "deep-link-select", &tool_token)
}

fn parse_body(
    body: Result<Form<LaunchRequest>, Errors<'_>>,
) -> Result<LaunchRequest, ApiError> {
    body.map(Form::into_inner)
        .map_err(|e| ApiError(AuthError::Validation(e.to_string())))
}

/// Run both launch gates: token validation, then state consumption and
/// issuer comparison.
async fn validate_launch(
    body: &LaunchRequest,
    cookies: &CookieJar<'_>,
    state: &LtiState,
) -> Result<IdTokenClaims, ApiError> {
    let claims = state.validator.validate(&body.id_token).await?;

    let expected_issuer = state.launch_state.consume(cookies, &body.state)?;
    LaunchStateGuard::verify_issuer(&expected_issuer, &claims.iss)?;

    Ok(claims)
}

fn redirect_with_token(
    state: &LtiState,
    relative_path: &str,
    tool_token: &str,
) -> Result<Redirect, ApiError> {
    let base = Url::parse(&state.lti.server_url)
        .map_err(|e| AuthError::Internal(format!("Bad server_url: {}", e)))?;
    let mut url = base
        .join(relative_path)
        .map_err(|e| AuthError::Internal(format!("Bad redirect path: {}", e)))?;
    url.query_pairs_mut().append_pair("lti", tool_token);
    Ok(Redirect::found(url.to_string()))
}
