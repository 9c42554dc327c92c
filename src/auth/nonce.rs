// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Single-use nonce accounting
//!
//! A nonce present in the store has been consumed. The check and the
//! write are one atomic `set_if_absent`, so two concurrent validations
//! of the same launch token cannot both observe "absent": exactly one
//! wins, the other fails with [`AuthError::NonceAlreadyUsed`]. Entries
//! are retained indefinitely; a consumed nonce stays consumed even when
//! the rest of its launch later fails.

use std::sync::Arc;

use super::error::AuthError;
use crate::storage::KeyValueStore;

/// Replay protection for launch nonces.
#[derive(Clone)]
pub struct NonceStore {
    store: Arc<dyn KeyValueStore>,
}

impl NonceStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Consume `nonce`, failing if it has ever been consumed before.
    pub fn check_and_consume(&self, nonce: &str) -> Result<(), AuthError> {
        if self.store.set_if_absent(nonce, "true".to_string()) {
            Ok(())
        } else {
            Err(AuthError::NonceAlreadyUsed)
        }
    }
}
