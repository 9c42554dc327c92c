// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! Validation rules that cannot be expressed in the JSON schema, plus
//! schema export for tooling.

use anyhow::{Context, Result};
use base64::Engine;
use log::debug;
use url::Url;

use super::Config;

/// Output the embedded JSON schema to the console.
///
/// This is what the `--show-config-schema` flag prints, so external
/// tooling can validate configuration files without running the
/// server.
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Accepts IPv4/IPv6 addresses and the usual special values like
/// `localhost` or `0.0.0.0`.
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against rules the JSON schema cannot
/// express: paired TLS material, base64 validity, port range, and a
/// parseable public URL.
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    // Validate SSL certificates
    if let Some(cert) = &config.server.cert {
        if config.server.key.is_none() {
            anyhow::bail!("SSL certificate provided without a key");
        }

        let _ = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
    }

    if let Some(key) = &config.server.key {
        if config.server.cert.is_none() {
            anyhow::bail!("SSL key provided without a certificate");
        }

        let _ = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
    }

    if config.server.port < 1 {
        anyhow::bail!("Invalid port number: {}", config.server.port);
    }

    if !is_valid_ip_address(&config.server.address) {
        debug!(
            "Potentially invalid address format: {}",
            config.server.address
        );
        // Just issue a warning but don't block
    }

    // The public URL is embedded into every registration request and
    // token, so it has to parse.
    Url::parse(&config.lti.server_url)
        .with_context(|| format!("Invalid server_url: {}", config.lti.server_url))?;

    if config.lti.jwt_secret.is_empty() {
        anyhow::bail!("jwt_secret must not be empty");
    }

    Ok(())
}
