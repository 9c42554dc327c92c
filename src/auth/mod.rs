// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Trust and credential layer
//!
//! This module is the security core of the tool: it decides whether an
//! inbound launch is trusted, prevents replay and CSRF, issues the
//! tool's own session credential, manages per-platform signing keys and
//! exchanges them for platform access tokens.
//!
//! Components, leaves first:
//!
//! - [`keys::KeyStore`]: RSA key pairs per platform, JWKS publication
//! - [`nonce::NonceStore`]: at-most-once launch nonces
//! - [`platform::PlatformRegistry`]: registered platform trust records
//! - [`validator::IdTokenValidator`]: inbound launch token validation
//! - [`tool_token::ToolTokenService`]: the tool's internal credential
//! - [`service_token::ServiceTokenClient`]: JWT-bearer token exchange
//! - [`launch_state::LaunchStateGuard`]: single-use login state
//!
//! All storage handles are injected (`Arc<dyn KeyValueStore>`), never
//! ambient, so every atomicity contract is testable against an
//! in-memory store.

pub mod error;
pub mod id_token;
pub mod keys;
pub mod launch_state;
pub mod nonce;
pub mod platform;
pub mod secure_token;
pub mod service_token;
pub mod tool_token;
pub mod validator;

pub use error::AuthError;
pub use id_token::{IdTokenClaims, IdTokenStore};
pub use keys::{Jwk, JwksDocument, KeyStore};
pub use launch_state::LaunchStateGuard;
pub use nonce::NonceStore;
pub use platform::{JwksMethod, Platform, PlatformRegistry};
pub use service_token::{ServiceAccessToken, ServiceTokenClient};
pub use tool_token::{ToolSession, ToolTokenService};
pub use validator::{HttpSigningKeyResolver, IdTokenValidator, SigningKeyResolver};
