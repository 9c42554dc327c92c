// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Inbound launch token validation
//!
//! [`IdTokenValidator`] is the gate every launch goes through. The
//! steps run in a fixed order and each one is a hard failure:
//!
//! 1. decode the token structurally (no signature) to read `iss`/`aud`
//!    and the `kid` header,
//! 2. look up the platform registered for `(iss, aud)`; registration
//!    is a prerequisite for trust,
//! 3. resolve the signing key from the platform's published JWKS and
//!    verify signature, algorithm (RS256 only), audience, issuer and
//!    expiry,
//! 4. consume the launch nonce, rejecting any token whose nonce has
//!    been seen before,
//! 5. hand back the full claim set.
//!
//! Key resolution is a capability ([`SigningKeyResolver`]) so the
//! validator is not coupled to how the JWKS is fetched; the HTTP
//! implementation fetches the document on every call.

use std::sync::Arc;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use log::debug;

use super::error::AuthError;
use super::id_token::IdTokenClaims;
use super::nonce::NonceStore;
use super::platform::{Platform, PlatformRegistry};

/// Capability to resolve a platform signing key by key id.
#[rocket::async_trait]
pub trait SigningKeyResolver: Send + Sync {
    /// Fetch the public key identified by `kid` from the JWKS document
    /// published at `jwks_location`.
    async fn resolve(&self, jwks_location: &str, kid: &str) -> Result<DecodingKey, AuthError>;
}

/// `SigningKeyResolver` that fetches the JWKS document over HTTP on
/// every call. Per-kid caching would be a valid optimization but is
/// not required for correctness.
pub struct HttpSigningKeyResolver {
    client: reqwest::Client,
}

impl HttpSigningKeyResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[rocket::async_trait]
impl SigningKeyResolver for HttpSigningKeyResolver {
    async fn resolve(&self, jwks_location: &str, kid: &str) -> Result<DecodingKey, AuthError> {
        debug!("Fetching JWKS from {}", jwks_location);
        let jwks: JwkSet = self
            .client
            .get(jwks_location)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let jwk = jwks.find(kid).ok_or_else(|| {
            AuthError::KeyResolution(format!("no key {} in JWKS at {}", kid, jwks_location))
        })?;
        DecodingKey::from_jwk(jwk)
            .map_err(|e| AuthError::KeyResolution(format!("unusable JWKS key {}: {}", kid, e)))
    }
}

/// Validator for platform-signed launch tokens.
#[derive(Clone)]
pub struct IdTokenValidator {
    registry: PlatformRegistry,
    nonces: NonceStore,
    key_resolver: Arc<dyn SigningKeyResolver>,
}

impl IdTokenValidator {
    pub fn new(
        registry: PlatformRegistry,
        nonces: NonceStore,
        key_resolver: Arc<dyn SigningKeyResolver>,
    ) -> Self {
        Self {
            registry,
            nonces,
            key_resolver,
        }
    }

    /// Validate a raw launch token and return its claims.
    ///
    /// Side effects are not rolled back on later failure: once the
    /// nonce is consumed it stays consumed, so a failed launch cannot
    /// be retried with the original token.
    pub async fn validate(&self, raw_token: &str) -> Result<IdTokenClaims, AuthError> {
        let header = decode_header(raw_token)?;
        let unverified = decode_unverified(raw_token)?;

        let platform = self
            .registry
            .find(&unverified.iss, &unverified.aud)?
            .ok_or(AuthError::PlatformNotFound)?;

        let kid = header
            .kid
            .ok_or_else(|| AuthError::KeyResolution("token header carries no kid".to_string()))?;
        let key = self
            .key_resolver
            .resolve(&platform.jwks_location, &kid)
            .await?;

        let claims = decode_verified(raw_token, &key, &platform)?;

        self.nonces.check_and_consume(&claims.nonce)?;

        debug!(
            "Validated launch for user {} from platform {}",
            claims.sub, claims.iss
        );
        Ok(claims)
    }
}

/// Structural decode without signature verification, used only to read
/// the issuer and audience for the registry lookup.
fn decode_unverified(raw_token: &str) -> Result<IdTokenClaims, AuthError> {
    let mut insecure = Validation::new(Algorithm::RS256);
    insecure.insecure_disable_signature_validation();
    insecure.validate_exp = false;
    insecure.validate_aud = false;
    insecure.required_spec_claims.clear();

    let data = decode::<IdTokenClaims>(raw_token, &DecodingKey::from_secret(&[]), &insecure)?;
    Ok(data.claims)
}

/// Full verification against the resolved platform key: RS256 only,
/// audience must be the registered client id, issuer must be the
/// registered issuer, expiry enforced.
fn decode_verified(
    raw_token: &str,
    key: &DecodingKey,
    platform: &Platform,
) -> Result<IdTokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[platform.client_id.as_str()]);
    validation.set_issuer(&[platform.url.as_str()]);

    let data = decode::<IdTokenClaims>(raw_token, key, &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::platform::JwksMethod;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use serde_json::json;

    struct FixedKeyResolver {
        kid: String,
        key_pem: Vec<u8>,
    }

    #[rocket::async_trait]
    impl SigningKeyResolver for FixedKeyResolver {
        async fn resolve(&self, _jwks_location: &str, kid: &str) -> Result<DecodingKey, AuthError> {
            if kid != self.kid {
                return Err(AuthError::KeyResolution(format!("no key {} in JWKS", kid)));
            }
            DecodingKey::from_rsa_pem(&self.key_pem)
                .map_err(|e| AuthError::KeyResolution(e.to_string()))
        }
    }

    fn rsa_pair() -> (EncodingKey, Vec<u8>) {
        let mut rng = rsa::rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_pem = RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let private_pem = private.to_pkcs8_pem(LineEnding::LF).unwrap();
        (
            EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap(),
            public_pem.into_bytes(),
        )
    }

    fn signed_token(signing_key: &EncodingKey, kid: &str, nonce: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = json!({
            "iss": "https://lms.example",
            "aud": "C1",
            "sub": "user-4",
            "nonce": nonce,
            "iat": now,
            "exp": now + 300,
            "https://purl.imsglobal.org/spec/lti/claim/deployment_id": "4",
        });
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, &claims, signing_key).unwrap()
    }

    fn validator_with(resolver: FixedKeyResolver, registered: bool) -> IdTokenValidator {
        let registry = PlatformRegistry::new(Arc::new(MemoryStore::new()));
        if registered {
            registry
                .register(&Platform {
                    url: "https://lms.example".to_string(),
                    name: "moodle".to_string(),
                    client_id: "C1".to_string(),
                    authentication_endpoint: "https://lms.example/auth".to_string(),
                    access_token_endpoint: "https://lms.example/token".to_string(),
                    jwks_method: JwksMethod::JwkSet,
                    jwks_location: "https://lms.example/jwks".to_string(),
                    kid: "tool-kid".to_string(),
                })
                .unwrap();
        }
        IdTokenValidator::new(
            registry,
            NonceStore::new(Arc::new(MemoryStore::new())),
            Arc::new(resolver),
        )
    }

    #[tokio::test]
    async fn valid_token_yields_claims_and_consumes_the_nonce() {
        let (signing_key, public_pem) = rsa_pair();
        let validator = validator_with(
            FixedKeyResolver {
                kid: "p-kid".to_string(),
                key_pem: public_pem,
            },
            true,
        );

        let token = signed_token(&signing_key, "p-kid", "nonce-1");
        let claims = validator.validate(&token).await.unwrap();
        assert_eq!(claims.sub, "user-4");
        assert_eq!(claims.deployment_id, "4");

        // Replaying the exact same token must hit the nonce gate.
        let err = validator.validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::NonceAlreadyUsed));
    }

    #[tokio::test]
    async fn unregistered_platform_is_rejected_before_any_key_fetch() {
        let (signing_key, public_pem) = rsa_pair();
        let validator = validator_with(
            FixedKeyResolver {
                kid: "p-kid".to_string(),
                key_pem: public_pem,
            },
            false,
        );

        let token = signed_token(&signing_key, "p-kid", "nonce-1");
        let err = validator.validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::PlatformNotFound));
    }

    #[tokio::test]
    async fn token_signed_by_a_foreign_key_fails_verification() {
        let (foreign_key, _) = rsa_pair();
        let (_, trusted_public_pem) = rsa_pair();
        let validator = validator_with(
            FixedKeyResolver {
                kid: "p-kid".to_string(),
                key_pem: trusted_public_pem,
            },
            true,
        );

        let token = signed_token(&foreign_key, "p-kid", "nonce-1");
        let err = validator.validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn unknown_kid_fails_key_resolution() {
        let (signing_key, public_pem) = rsa_pair();
        let validator = validator_with(
            FixedKeyResolver {
                kid: "p-kid".to_string(),
                key_pem: public_pem,
            },
            true,
        );

        let token = signed_token(&signing_key, "other-kid", "nonce-1");
        let err = validator.validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyResolution(_)));
    }
}
