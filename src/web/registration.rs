// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Platform-initiated dynamic registration
//!
//! The platform opens this endpoint with a pointer to its OpenID
//! configuration and a one-time registration token. The tool fetches
//! the configuration, registers itself (redirect URIs, JWKS URI,
//! supported messages and scopes), generates the key pair for the new
//! platform and stores the trust record. Registering the same
//! `(issuer, client id)` twice is a conflict: the existing record and
//! key pair are left untouched.

use std::collections::HashMap;

use handlebars::Handlebars;
use log::info;
use reqwest::header::AUTHORIZATION;
use rocket::response::content::RawHtml;
use rocket::serde::json::json;
use rocket::{get, State};
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::ApiError;
use super::state::LtiState;
use crate::auth::{AuthError, JwksMethod, Platform};

/// The platform's OpenID configuration document, reduced to the fields
/// the registration flow needs.
#[derive(Debug, Deserialize)]
pub struct OpenIdConfiguration {
    pub issuer: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub authorization_endpoint: String,
    pub registration_endpoint: String,
    #[serde(default)]
    pub claims_supported: Vec<String>,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti-platform-configuration")]
    pub lti_platform_configuration: Option<LtiPlatformConfiguration>,
}

#[derive(Debug, Deserialize)]
pub struct LtiPlatformConfiguration {
    pub product_family_code: String,
}

/// Dynamic client registration request posted to the platform.
#[derive(Debug, Serialize)]
struct ClientRegistrationRequest {
    application_type: &'static str,
    grant_types: Vec<&'static str>,
    response_types: Vec<&'static str>,
    redirect_uris: Vec<String>,
    initiate_login_uri: String,
    client_name: String,
    jwks_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    logo_uri: Option<String>,
    token_endpoint_auth_method: &'static str,
    scope: String,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti-tool-configuration")]
    lti_tool_configuration: LtiToolConfiguration,
}

#[derive(Debug, Serialize)]
struct LtiToolConfiguration {
    domain: String,
    description: String,
    target_link_uri: String,
    custom_parameters: HashMap<String, String>,
    claims: Vec<String>,
    messages: Vec<ToolMessage>,
}

#[derive(Debug, Serialize)]
struct ToolMessage {
    #[serde(rename = "type")]
    message_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_link_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientRegistrationResponse {
    client_id: String,
}

#[get("/registration?<openid_configuration>&<registration_token>")]
pub async fn registration(
    openid_configuration: Option<String>,
    registration_token: Option<String>,
    state: &State<LtiState>,
) -> Result<RawHtml<String>, ApiError> {
    let configuration_endpoint = openid_configuration.ok_or_else(|| {
        AuthError::Validation("Missing openid_configuration parameter".to_string())
    })?;

    let configuration: OpenIdConfiguration = state
        .http
        .get(&configuration_endpoint)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let request = build_registration_request(state, &configuration)?;
    let mut registration_post = state
        .http
        .post(&configuration.registration_endpoint)
        .json(&request);
    if let Some(token) = &registration_token {
        registration_post = registration_post.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let response: ClientRegistrationResponse = registration_post
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    // Fast-fail before minting a key pair; the registry insert below
    // stays the atomic gate for concurrent registrations.
    if state
        .registry
        .is_registered(&configuration.issuer, &response.client_id)
    {
        return Err(AuthError::AlreadyRegistered.into());
    }

    let platform_name = configuration
        .lti_platform_configuration
        .as_ref()
        .map(|c| c.product_family_code.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let kid = state.keys.generate_key_pair()?;
    let platform = Platform {
        url: configuration.issuer.clone(),
        name: platform_name,
        client_id: response.client_id.clone(),
        authentication_endpoint: configuration.authorization_endpoint.clone(),
        access_token_endpoint: configuration.token_endpoint.clone(),
        jwks_method: JwksMethod::JwkSet,
        jwks_location: configuration.jwks_uri.clone(),
        kid,
    };

    state.registry.register(&platform)?;
    info!(
        "New platform registered: {} (client id {})",
        platform.url, platform.client_id
    );

    Ok(RawHtml(render_close_page()))
}

fn build_registration_request(
    state: &LtiState,
    configuration: &OpenIdConfiguration,
) -> Result<ClientRegistrationRequest, AuthError> {
    let base = Url::parse(&state.lti.server_url)
        .map_err(|e| AuthError::Internal(format!("Bad server_url: {}", e)))?;
    let join = |path: &str| {
        base.join(path)
            .map(|u| u.to_string())
            .map_err(|e| AuthError::Internal(format!("Bad tool URL {}: {}", path, e)))
    };
    let launch_url = join("launch")?;
    let deep_link_url = join("deep-link-launch")?;
    let login_url = join("login")?;
    let keys_url = join("keys")?;

    Ok(ClientRegistrationRequest {
        application_type: "web",
        grant_types: vec!["implicit", "client_credentials"],
        response_types: vec!["id_token"],
        redirect_uris: vec![launch_url.clone(), deep_link_url.clone()],
        initiate_login_uri: login_url,
        client_name: state.lti.client_name.clone(),
        jwks_uri: keys_url,
        logo_uri: state.lti.logo_uri.clone(),
        token_endpoint_auth_method: "private_key_jwt",
        scope: state.lti.scopes.join(" "),
        lti_tool_configuration: LtiToolConfiguration {
            domain: state.lti.server_url.clone(),
            description: state.lti.description.clone(),
            target_link_uri: launch_url,
            custom_parameters: HashMap::new(),
            claims: configuration.claims_supported.clone(),
            messages: vec![
                ToolMessage {
                    message_type: "LtiResourceLinkRequest",
                    target_link_uri: None,
                },
                ToolMessage {
                    message_type: "LtiDeepLinkingRequest",
                    target_link_uri: Some(deep_link_url),
                },
            ],
        },
    })
}

/// The page closing the registration popup via the IMS postMessage
/// handshake.
fn render_close_page() -> String {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string(
            "registration_close",
            include_str!("../../resources/forms/registration_close.hbs"),
        )
        .expect("Failed to register close template");

    handlebars
        .render("registration_close", &json!({}))
        .expect("Failed to render close template")
}
