// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request guards for bearer-authenticated endpoints

use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};

use super::error::ApiError;
use super::state::LtiState;
use crate::auth::{AuthError, ToolSession};

/// Raw bearer token extracted from the `Authorization` header.
pub struct BearerToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth_header = match request.headers().get_one("Authorization") {
            Some(header) => header,
            None => {
                return request::Outcome::Error((
                    Status::Unauthorized,
                    ApiError(AuthError::MissingBearerToken),
                ))
            }
        };

        let mut parts = auth_header.splitn(2, ' ');
        if parts.next() != Some("Bearer") {
            return request::Outcome::Error((
                Status::Unauthorized,
                ApiError(AuthError::InvalidAuthScheme),
            ));
        }

        match parts.next() {
            Some(token) if !token.is_empty() => {
                request::Outcome::Success(BearerToken(token.to_string()))
            }
            _ => request::Outcome::Error((
                Status::Unauthorized,
                ApiError(AuthError::MissingBearerToken),
            )),
        }
    }
}

/// A verified tool-token session.
///
/// Resolving this guard verifies the bearer token against the tool's
/// process secret; no storage is touched.
pub struct AuthenticatedLaunch {
    pub session: ToolSession,
    /// The raw token, kept for logging and troubleshooting.
    pub token: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedLaunch {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match BearerToken::from_request(request).await {
            request::Outcome::Success(token) => token.0,
            request::Outcome::Error(failure) => return request::Outcome::Error(failure),
            request::Outcome::Forward(forward) => return request::Outcome::Forward(forward),
        };

        let state = request
            .rocket()
            .state::<LtiState>()
            .expect("LtiState not configured");

        match state.tool_tokens.verify(&token) {
            Ok(session) => request::Outcome::Success(AuthenticatedLaunch { session, token }),
            Err(err) => request::Outcome::Error((Status::Unauthorized, ApiError(err))),
        }
    }
}
