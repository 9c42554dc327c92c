// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Key-value storage contract and in-memory implementation
//!
//! Every persistent collection of the tool (registered platforms, key
//! pairs, consumed nonces, validated launch claims) is kept behind the
//! same minimal key-value contract so the protocol components can be
//! wired against any backend. The contract deliberately has no ordering
//! or TTL guarantees; the one compound operation is `set_if_absent`,
//! which must be atomic with respect to concurrent callers; it is the
//! primitive behind both replay protection and duplicate-registration
//! detection.

use std::collections::HashMap;
use std::sync::RwLock;

/// Minimal storage contract shared by all persistent collections.
///
/// Implementations must be safe for concurrent use: plain reads may run
/// freely in parallel, and `set_if_absent` must behave as a single
/// atomic check-and-set (under concurrent calls with the same key,
/// exactly one caller observes `true`).
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Whether a value exists under `key`.
    fn has(&self, key: &str) -> bool;

    /// All keys currently present, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Store `value` under `key` only if the key is currently absent.
    ///
    /// Returns `true` if the value was written, `false` if the key was
    /// already occupied. The check and the write happen under one lock
    /// acquisition.
    fn set_if_absent(&self, key: &str, value: String) -> bool;
}

/// In-memory `KeyValueStore` backed by a `RwLock<HashMap>`.
///
/// This is the storage used by the server binary and the test suite.
/// A deployment needing durability can substitute any other
/// implementation of the trait without touching the protocol code.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().expect("storage lock poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .write()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value);
    }

    fn has(&self, key: &str) -> bool {
        self.entries.read().expect("storage lock poisoned").contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .expect("storage lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn set_if_absent(&self, key: &str, value: String) -> bool {
        let mut entries = self.entries.write().expect("storage lock poisoned");
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), value);
        true
    }
}
