// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Platform access tokens via the JWT-bearer client-credentials grant
//!
//! Calling back into a platform (score submission, roster lookup)
//! requires an access token from the platform's token endpoint. The
//! tool authenticates with a client assertion: a short-lived JWT signed
//! RS256 with the key pair generated for that platform at registration,
//! carrying the assigned client id and a fresh `jti`. No retry or
//! timeout policy lives here; any transport or parse failure is
//! terminal for the call and the caller decides whether to redo the
//! whole launch-scoped operation.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::debug;
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::keys::KeyStore;
use super::platform::Platform;
use super::secure_token;

/// OAuth2 client assertion type for the JWT-bearer grant.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// A scoped access token obtained from a platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccessToken {
    pub token_type: String,
    pub access_token: String,
}

#[derive(Serialize)]
struct ClientAssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    jti: String,
    iat: i64,
    exp: i64,
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    grant_type: &'a str,
    client_assertion_type: &'a str,
    client_assertion: &'a str,
    scope: String,
}

/// Client for the platform token endpoint.
#[derive(Clone)]
pub struct ServiceTokenClient {
    keys: KeyStore,
    client: reqwest::Client,
}

impl ServiceTokenClient {
    pub fn new(keys: KeyStore, client: reqwest::Client) -> Self {
        Self { keys, client }
    }

    /// Exchange the platform's key pair for an access token covering
    /// `scopes`.
    ///
    /// A missing private key is an internal-consistency fault (the
    /// platform record should never outlive its key pair), not a
    /// client error.
    pub async fn get_access_token(
        &self,
        platform: &Platform,
        scopes: &[&str],
    ) -> Result<ServiceAccessToken, AuthError> {
        let private_pem = self
            .keys
            .private_key_pem(&platform.kid)
            .ok_or(AuthError::PlatformPrivateKeyNotFound)?;
        let signing_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())?;

        let now = Utc::now();
        let claims = ClientAssertionClaims {
            iss: &platform.client_id,
            sub: &platform.client_id,
            aud: &platform.client_id,
            jti: secure_token::random_token()?,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(platform.kid.clone());
        let assertion = encode(&header, &claims, &signing_key)?;

        let request = AccessTokenRequest {
            grant_type: "client_credentials",
            client_assertion_type: CLIENT_ASSERTION_TYPE,
            client_assertion: &assertion,
            scope: scopes.join(" "),
        };

        debug!(
            "Requesting access token from {} for scopes [{}]",
            platform.access_token_endpoint, request.scope
        );
        let token: ServiceAccessToken = self
            .client
            .post(&platform.access_token_endpoint)
            .form(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::platform::JwksMethod;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn client_without_keys() -> ServiceTokenClient {
        let keys = KeyStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
        ServiceTokenClient::new(keys, reqwest::Client::new())
    }

    #[tokio::test]
    async fn missing_private_key_is_an_internal_fault() {
        let client = client_without_keys();
        let platform = Platform {
            url: "https://lms.example".to_string(),
            name: "moodle".to_string(),
            client_id: "C1".to_string(),
            authentication_endpoint: "https://lms.example/auth".to_string(),
            access_token_endpoint: "https://lms.example/token".to_string(),
            jwks_method: JwksMethod::JwkSet,
            jwks_location: "https://lms.example/jwks".to_string(),
            kid: "gone".to_string(),
        };

        let err = client
            .get_access_token(&platform, &["https://purl.imsglobal.org/spec/lti-ags/scope/score"])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PlatformPrivateKeyNotFound));
    }
}
