// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Secure random token generation
//!
//! Single source of opaque single-use values: launch nonces, login
//! states, assertion `jti`s and key ids are all produced here, from the
//! operating system RNG. Nothing security-sensitive in this crate may
//! draw randomness from anywhere else.

use rand::rngs::OsRng;
use rand::TryRngCore;

use super::error::AuthError;

/// Number of random bytes in a key id (`kid`).
pub const KID_BYTES: usize = 16;

/// Number of random bytes in a nonce, state or `jti` value.
pub const TOKEN_BYTES: usize = 25;

/// Generate `n_bytes` of OS randomness, hex encoded.
pub fn random_hex(n_bytes: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; n_bytes];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Internal(format!("OS RNG unavailable: {}", e)))?;
    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}

/// A fresh key id.
pub fn random_kid() -> Result<String, AuthError> {
    random_hex(KID_BYTES)
}

/// A fresh opaque single-use token (nonce, state, `jti`).
pub fn random_token() -> Result<String, AuthError> {
    random_hex(TOKEN_BYTES)
}
