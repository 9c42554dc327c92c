// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared application state for the web layer
//!
//! One [`LtiState`] is built at startup and registered with Rocket;
//! every route reaches the protocol components through it. All stores
//! are injected, so the test suite can build a state over fresh
//! in-memory stores per test.

use std::sync::Arc;

use crate::auth::{
    HttpSigningKeyResolver, IdTokenStore, IdTokenValidator, KeyStore, LaunchStateGuard,
    NonceStore, PlatformRegistry, ServiceTokenClient, ToolTokenService,
};
use crate::config::{Config, LtiConfig};
use crate::storage::{KeyValueStore, MemoryStore};

/// Everything the routes need, wired once at startup.
pub struct LtiState {
    /// Tool identity section of the configuration.
    pub lti: LtiConfig,
    pub registry: PlatformRegistry,
    pub keys: KeyStore,
    pub id_tokens: IdTokenStore,
    pub validator: IdTokenValidator,
    pub tool_tokens: ToolTokenService,
    pub service_tokens: ServiceTokenClient,
    pub launch_state: LaunchStateGuard,
    /// Shared HTTP client for registration fetches and service
    /// proxying.
    pub http: reqwest::Client,
}

impl LtiState {
    /// Build a state over fresh in-memory stores.
    pub fn from_config(config: &Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    /// Build a state over caller-provided stores. This is the seam the
    /// tests (and any persistent deployment) use.
    pub fn with_stores(
        config: &Config,
        platforms: Arc<dyn KeyValueStore>,
        nonces: Arc<dyn KeyValueStore>,
        public_keys: Arc<dyn KeyValueStore>,
        private_keys: Arc<dyn KeyValueStore>,
        id_tokens: Arc<dyn KeyValueStore>,
    ) -> Self {
        let http = reqwest::Client::new();
        let registry = PlatformRegistry::new(platforms);
        let keys = KeyStore::new(public_keys, private_keys);
        let validator = IdTokenValidator::new(
            registry.clone(),
            NonceStore::new(nonces),
            Arc::new(HttpSigningKeyResolver::new(http.clone())),
        );
        let tool_tokens =
            ToolTokenService::new(config.lti.jwt_secret.as_bytes(), &config.lti.server_url);
        let service_tokens = ServiceTokenClient::new(keys.clone(), http.clone());

        Self {
            lti: config.lti.clone(),
            registry,
            keys,
            id_tokens: IdTokenStore::new(id_tokens),
            validator,
            tool_tokens,
            service_tokens,
            launch_state: LaunchStateGuard::new(),
            http,
        }
    }
}
