// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! LTI tool configuration section

use serde::{Deserialize, Serialize};

/// Settings for the LTI tool itself: its public identity and the
/// secret backing its internal session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtiConfig {
    /// The tool's canonical public URL. Used as the issuer of tool
    /// tokens and as the base of every URL sent to platforms at
    /// registration time, so it must match what platforms can reach.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Process-wide secret signing the tool's session tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Client name announced during dynamic registration.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Tool description announced during dynamic registration.
    #[serde(default = "default_description")]
    pub description: String,

    /// Logo shown by platforms next to the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,

    /// Service scopes requested at registration time.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_server_url() -> String {
    "https://localhost:8080".to_string()
}

fn default_jwt_secret() -> String {
    "insecure-default-lti-tool-secret-change-me".to_string()
}

fn default_client_name() -> String {
    "Rust LTI Tool".to_string()
}

fn default_description() -> String {
    "LTI 1.3 tool provider".to_string()
}

fn default_scopes() -> Vec<String> {
    [
        "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem.readonly",
        "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem",
        "https://purl.imsglobal.org/spec/lti-ags/scope/score",
        "https://purl.imsglobal.org/spec/lti-ags/scope/result.readonly",
        "https://purl.imsglobal.org/spec/lti-nrps/scope/contextmembership.readonly",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for LtiConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            jwt_secret: default_jwt_secret(),
            client_name: default_client_name(),
            description: default_description(),
            logo_uri: None,
            scopes: default_scopes(),
        }
    }
}
