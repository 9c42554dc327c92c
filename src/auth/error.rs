// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy for the trust and credential layer
//!
//! Every failure a protocol component can produce is a variant of
//! [`AuthError`]. The set is closed on purpose: the HTTP boundary maps
//! it to status codes with an exhaustive match (see `web::error`), so a
//! new failure mode cannot silently fall into a catch-all.

use thiserror::Error;

/// Failures raised by the trust and credential components.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed request body or query parameters.
    #[error("{0}")]
    Validation(String),

    /// No platform is registered for the `(issuer, client_id)` pair.
    #[error("Platform not found.")]
    PlatformNotFound,

    /// A stored record the request depends on is absent.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Signature, expiry, audience or issuer verification failed.
    #[error("Invalid token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// The platform's JWKS does not contain a usable key for the token.
    #[error("Unable to resolve platform signing key: {0}")]
    KeyResolution(String),

    /// The `Authorization` header does not carry a `Bearer` scheme.
    #[error("Invalid schema")]
    InvalidAuthScheme,

    /// The `Authorization` header carries no token.
    #[error("Token not found")]
    MissingBearerToken,

    /// The launch nonce has already been consumed.
    #[error("Nonce already used.")]
    NonceAlreadyUsed,

    /// The login state cookie is absent or bound to a different issuer.
    #[error("Invalid state")]
    InvalidState,

    /// A platform with this `(issuer, client_id)` is already registered.
    #[error("Platform already registered")]
    AlreadyRegistered,

    /// A platform record exists but its private key is gone. A platform
    /// record must never outlive its key pair, so this is an
    /// internal-consistency fault rather than a client error.
    #[error("Platform private key not found.")]
    PlatformPrivateKeyNotFound,

    /// An outbound call (JWKS fetch, token endpoint, service proxy)
    /// failed at the transport or HTTP level.
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Anything unexpected.
    #[error("{0}")]
    Internal(String),
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Internal(format!("Serialization failed: {}", err))
    }
}
