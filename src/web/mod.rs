// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP boundary of the LTI tool
//!
//! One file per endpoint group, mirroring the flows a platform drives:
//! login redirect, launch posts, deep-link selection, JWKS publication,
//! dynamic registration and the bearer-authenticated service proxies.
//! The boundary owns the mapping from the error taxonomy to status
//! codes; protocol decisions live in [`crate::auth`].

pub mod deep_link;
pub mod error;
pub mod guards;
pub mod keys;
pub mod launch;
pub mod login;
pub mod registration;
pub mod server;
pub mod services;
pub mod state;

pub use error::ApiError;
pub use server::{build_rocket, build_rocket_with_state, configure_tls};
pub use state::LtiState;
