// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP mapping of the error taxonomy
//!
//! [`ApiError`] wraps [`AuthError`] and implements `Responder`, turning
//! every variant into its status code with a small JSON body. The match
//! is total over the taxonomy: adding a variant without deciding its
//! status is a compile error, not a silent 500.

use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{Responder, Response};

use crate::auth::AuthError;

/// Boundary wrapper turning an [`AuthError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl ApiError {
    /// The status code for the wrapped error.
    pub fn status(&self) -> Status {
        match &self.0 {
            AuthError::Validation(_) => Status::BadRequest,
            AuthError::PlatformNotFound | AuthError::NotFound(_) => Status::NotFound,
            AuthError::InvalidToken(_)
            | AuthError::KeyResolution(_)
            | AuthError::InvalidAuthScheme
            | AuthError::MissingBearerToken
            | AuthError::NonceAlreadyUsed
            | AuthError::InvalidState => Status::Unauthorized,
            AuthError::AlreadyRegistered => Status::Conflict,
            AuthError::PlatformPrivateKeyNotFound
            | AuthError::Upstream(_)
            | AuthError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError(AuthError::from(err))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError(AuthError::from(err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError(AuthError::from(err))
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            log::error!("Request failed: {}", self.0);
        } else {
            log::debug!("Request rejected ({}): {}", status.code, self.0);
        }

        let body = serde_json::json!({ "error": self.0.to_string() }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
