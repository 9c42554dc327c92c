// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Platform trust records
//!
//! A [`Platform`] is everything the tool knows about a registered
//! learning platform: its issuer URL, OAuth client id, the endpoints to
//! redirect logins to and request access tokens from, where its JWKS
//! lives, and the key id of the tool-side key pair generated for it.
//! Records are created once at registration and are immutable
//! afterwards: a second registration for the same `(issuer, client
//! id)` is a conflict, never a silent overwrite.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::AuthError;
use crate::storage::KeyValueStore;

/// How a platform publishes its signing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JwksMethod {
    /// A JWKS document fetched from `jwks_location`.
    JwkSet,
}

/// A registered learning platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    /// Issuer URL, the platform's identity in every ID token it signs.
    pub url: String,
    /// Human-readable platform name (product family code at
    /// registration time).
    pub name: String,
    /// OAuth client id this tool was assigned by the platform.
    pub client_id: String,
    /// Endpoint the login redirect sends the browser to.
    pub authentication_endpoint: String,
    /// OAuth2 token endpoint for the client-credentials exchange.
    pub access_token_endpoint: String,
    /// How the platform's signing keys are published.
    pub jwks_method: JwksMethod,
    /// Where the platform's signing keys are published.
    pub jwks_location: String,
    /// Key id of the tool-side key pair generated for this platform.
    pub kid: String,
}

/// Persistent registry of platform trust records, keyed by
/// `issuer:client_id`.
#[derive(Clone)]
pub struct PlatformRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl PlatformRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn storage_key(issuer: &str, client_id: &str) -> String {
        format!("{}:{}", issuer, client_id)
    }

    /// Register a platform. Atomic per `(issuer, client_id)`: of two
    /// concurrent registrations, exactly one succeeds and the loser
    /// gets [`AuthError::AlreadyRegistered`].
    pub fn register(&self, platform: &Platform) -> Result<(), AuthError> {
        let key = Self::storage_key(&platform.url, &platform.client_id);
        let record = serde_json::to_string(platform)?;
        if self.store.set_if_absent(&key, record) {
            Ok(())
        } else {
            Err(AuthError::AlreadyRegistered)
        }
    }

    /// Look up the platform registered for `(issuer, client_id)`.
    pub fn find(&self, issuer: &str, client_id: &str) -> Result<Option<Platform>, AuthError> {
        match self.store.get(&Self::storage_key(issuer, client_id)) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Whether `(issuer, client_id)` is already registered.
    pub fn is_registered(&self, issuer: &str, client_id: &str) -> bool {
        self.store.has(&Self::storage_key(issuer, client_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn sample_platform(kid: &str) -> Platform {
        Platform {
            url: "https://lms.example".to_string(),
            name: "moodle".to_string(),
            client_id: "C1".to_string(),
            authentication_endpoint: "https://lms.example/auth".to_string(),
            access_token_endpoint: "https://lms.example/token".to_string(),
            jwks_method: JwksMethod::JwkSet,
            jwks_location: "https://lms.example/jwks".to_string(),
            kid: kid.to_string(),
        }
    }

    #[test]
    fn register_then_find_round_trips() {
        let registry = PlatformRegistry::new(Arc::new(MemoryStore::new()));
        let platform = sample_platform("k1");
        registry.register(&platform).unwrap();

        let found = registry.find("https://lms.example", "C1").unwrap().unwrap();
        assert_eq!(found, platform);
        assert!(registry.find("https://lms.example", "C2").unwrap().is_none());
    }

    #[test]
    fn duplicate_registration_is_a_conflict_and_keeps_the_original() {
        let registry = PlatformRegistry::new(Arc::new(MemoryStore::new()));
        registry.register(&sample_platform("original")).unwrap();

        let err = registry.register(&sample_platform("usurper")).unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));

        let stored = registry.find("https://lms.example", "C1").unwrap().unwrap();
        assert_eq!(stored.kid, "original");
    }

    #[test]
    fn concurrent_registration_has_one_winner() {
        let registry = PlatformRegistry::new(Arc::new(MemoryStore::new()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.register(&sample_platform(&format!("k{}", i))).is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("registration thread panicked"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn jwks_method_serializes_to_the_wire_name() {
        let json = serde_json::to_string(&JwksMethod::JwkSet).unwrap();
        assert_eq!(json, "\"JWK_SET\"");
    }
}
