// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The tool's own session credential
//!
//! After a launch is validated, the tool hands the client a short-lived
//! HS256 token carrying just the launch identity (user, client,
//! platform, deployment). It is signed with a process-wide secret and
//! verified statelessly with no storage lookup, so verification cost does
//! not depend on the nonce store or platform registry. The token is
//! deliberately decoupled from the platform-signed ID token: the tool
//! never re-exposes platform-signed material to its own clients.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::id_token::IdTokenClaims;

/// Launch identity carried by a tool token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSession {
    pub user_id: String,
    pub client_id: String,
    pub platform_url: String,
    pub deployment_id: String,
}

impl From<&IdTokenClaims> for ToolSession {
    fn from(claims: &IdTokenClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            client_id: claims.aud.clone(),
            platform_url: claims.iss.clone(),
            deployment_id: claims.deployment_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ToolTokenClaims {
    #[serde(flatten)]
    session: ToolSession,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies the tool's internal bearer credential.
#[derive(Clone)]
pub struct ToolTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    validity: Duration,
}

impl ToolTokenService {
    /// Create a service signing with `secret`, stamping `issuer` (the
    /// tool's canonical URL) into every token. Tokens are valid for
    /// one hour.
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            validity: Duration::hours(1),
        }
    }

    /// Override the validity window of issued tokens.
    pub fn valid_for(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Sign a session into a bearer token.
    pub fn issue(&self, session: &ToolSession) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = ToolTokenClaims {
            session: session.clone(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Issue a token for a freshly validated launch.
    pub fn issue_for(&self, claims: &IdTokenClaims) -> Result<String, AuthError> {
        self.issue(&ToolSession::from(claims))
    }

    /// Verify a bearer token and recover the session it carries.
    pub fn verify(&self, token: &str) -> Result<ToolSession, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<ToolTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims.session)
    }
}
