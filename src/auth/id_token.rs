// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Launch claims and their persistence
//!
//! [`IdTokenClaims`] is the platform-signed launch assertion after
//! validation. The LTI claim names are full URIs; the struct models
//! every claim the tool reads and keeps anything else in a flattened
//! map so the persisted record is the complete claim set the platform
//! signed.
//!
//! Validated claims are persisted keyed by
//! `issuer:client_id:deployment_id:user_id` so later service calls in
//! the same session (membership lookup, score submission) can recover
//! the service endpoint URLs the platform advertised at launch time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::AuthError;
use crate::storage::KeyValueStore;

/// Course context the launch happened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextClaim {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub context_type: Option<Vec<String>>,
}

/// The resource link the launch targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLinkClaim {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Assignment and Grade Services endpoints advertised by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgsEndpointClaim {
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineitems: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineitem: Option<String>,
}

/// Names and Role Provisioning Services endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamesRoleServiceClaim {
    pub context_memberships_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_versions: Option<Vec<String>>,
}

/// Deep-linking settings present on `LtiDeepLinkingRequest` launches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepLinkingSettingsClaim {
    pub deep_link_return_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_presentation_document_targets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// The validated launch assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Platform issuer URL.
    pub iss: String,
    /// Audience: the client id assigned to this tool.
    pub aud: String,
    /// Platform user id.
    pub sub: String,
    /// Single-use launch nonce.
    pub nonce: String,
    pub iat: i64,
    pub exp: i64,

    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/deployment_id")]
    pub deployment_id: String,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/message_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_type: Option<String>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/version",
        skip_serializing_if = "Option::is_none"
    )]
    pub lti_version: Option<String>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/target_link_uri",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_link_uri: Option<String>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/roles",
        skip_serializing_if = "Option::is_none"
    )]
    pub roles: Option<Vec<String>>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/context",
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<ContextClaim>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/resource_link",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_link: Option<ResourceLinkClaim>,

    /// Custom parameters configured on the platform side; the tool
    /// reads `resource_id` from here.
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/custom",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom: Option<HashMap<String, Value>>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti-ags/claim/endpoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub ags_endpoint: Option<AgsEndpointClaim>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti-nrps/claim/namesroleservice",
        skip_serializing_if = "Option::is_none"
    )]
    pub names_role_service: Option<NamesRoleServiceClaim>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti-dl/claim/deep_linking_settings",
        skip_serializing_if = "Option::is_none"
    )]
    pub deep_linking_settings: Option<DeepLinkingSettingsClaim>,

    /// Every claim the tool does not model (names, email, launch
    /// presentation, tool platform description, ...), preserved
    /// verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl IdTokenClaims {
    /// The `resource_id` custom parameter, if the platform sent one.
    /// Platforms encode it either as a string or a number.
    pub fn resource_id(&self) -> Option<String> {
        let value = self.custom.as_ref()?.get("resource_id")?;
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Persistence for validated launch claims.
#[derive(Clone)]
pub struct IdTokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl IdTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Storage key for a launch: `issuer:client_id:deployment_id:user_id`.
    pub fn storage_key(issuer: &str, client_id: &str, deployment_id: &str, user_id: &str) -> String {
        format!("{}:{}:{}:{}", issuer, client_id, deployment_id, user_id)
    }

    /// Persist validated claims, replacing any previous launch for the
    /// same key.
    pub fn save(&self, claims: &IdTokenClaims) -> Result<(), AuthError> {
        let key = Self::storage_key(&claims.iss, &claims.aud, &claims.deployment_id, &claims.sub);
        log::debug!("Storing validated launch claims under {}", key);
        self.store.set(&key, serde_json::to_string(claims)?);
        Ok(())
    }

    /// Recover the most recent launch claims for a session.
    pub fn load(
        &self,
        issuer: &str,
        client_id: &str,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Option<IdTokenClaims>, AuthError> {
        match self
            .store
            .get(&Self::storage_key(issuer, client_id, deployment_id, user_id))
        {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn sample_claims() -> IdTokenClaims {
        serde_json::from_value(json!({
            "iss": "https://lms.example",
            "aud": "C1",
            "sub": "user-4",
            "nonce": "n-1",
            "iat": 1_716_983_501,
            "exp": 1_716_983_561,
            "https://purl.imsglobal.org/spec/lti/claim/deployment_id": "4",
            "https://purl.imsglobal.org/spec/lti/claim/message_type": "LtiResourceLinkRequest",
            "https://purl.imsglobal.org/spec/lti/claim/custom": {
                "resource_id": "2",
                "context_memberships_url": "https://lms.example/memberships"
            },
            "https://purl.imsglobal.org/spec/lti-ags/claim/endpoint": {
                "scope": ["https://purl.imsglobal.org/spec/lti-ags/scope/score"],
                "lineitems": "https://lms.example/lineitems?type_id=4",
                "lineitem": "https://lms.example/lineitems/19/lineitem?type_id=4"
            },
            "name": "Sam Student",
            "email": "student@moodle.a"
        }))
        .unwrap()
    }

    #[test]
    fn unmodeled_claims_survive_a_round_trip() {
        let claims = sample_claims();
        assert_eq!(claims.extra.get("name"), Some(&json!("Sam Student")));

        let raw = serde_json::to_string(&claims).unwrap();
        let back: IdTokenClaims = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.extra.get("email"), Some(&json!("student@moodle.a")));
        assert_eq!(back.deployment_id, "4");
    }

    #[test]
    fn resource_id_reads_strings_and_numbers() {
        let mut claims = sample_claims();
        assert_eq!(claims.resource_id().as_deref(), Some("2"));

        claims
            .custom
            .as_mut()
            .unwrap()
            .insert("resource_id".to_string(), json!(7));
        assert_eq!(claims.resource_id().as_deref(), Some("7"));

        claims.custom = None;
        assert!(claims.resource_id().is_none());
    }

    #[test]
    fn store_round_trips_under_the_composite_key() {
        let store = IdTokenStore::new(Arc::new(MemoryStore::new()));
        let claims = sample_claims();
        store.save(&claims).unwrap();

        let loaded = store
            .load("https://lms.example", "C1", "4", "user-4")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.sub, "user-4");
        assert!(store.load("https://lms.example", "C1", "4", "nobody").unwrap().is_none());
    }
}
