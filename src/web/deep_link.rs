// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Deep-link content selection response
//!
//! When the user picks a resource inside the tool, the tool answers the
//! platform's `LtiDeepLinkingRequest` with a signed
//! `LtiDeepLinkingResponse` message: a content-item JWT signed RS256
//! with the platform's key pair, posted back to the platform's return
//! URL by an auto-submitting form.

use chrono::{Duration, Utc};
use handlebars::Handlebars;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rocket::response::content::RawHtml;
use rocket::serde::json::{json, Json};
use rocket::{post, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::guards::AuthenticatedLaunch;
use super::state::LtiState;
use crate::auth::{secure_token, AuthError};

/// Lifetime of a deep-linking response message, in seconds.
const DEEP_LINK_MESSAGE_LIFETIME_SECS: i64 = 60;

/// Body of a resource selection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkResourceRequest {
    pub resource_id: i64,
}

#[derive(Serialize)]
struct DeepLinkingResponseClaims<'a> {
    iss: &'a str,
    aud: &'a str,
    nonce: String,
    iat: i64,
    exp: i64,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/deployment_id")]
    deployment_id: &'a str,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/message_type")]
    message_type: &'a str,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/version")]
    version: &'a str,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti-dl/claim/content_items")]
    content_items: Vec<Value>,
}

#[post("/deep-link-resource", data = "<body>")]
pub async fn deep_link_resource(
    launch: AuthenticatedLaunch,
    body: Result<Json<DeepLinkResourceRequest>, rocket::serde::json::Error<'_>>,
    state: &State<LtiState>,
) -> Result<RawHtml<String>, ApiError> {
    let body = body.map_err(|e| AuthError::Validation(e.to_string()))?;
    let session = &launch.session;

    let platform = state
        .registry
        .find(&session.platform_url, &session.client_id)?
        .ok_or(AuthError::PlatformNotFound)?;

    let private_pem = state
        .keys
        .private_key_pem(&platform.kid)
        .ok_or(AuthError::NotFound("Platform private key"))?;
    let signing_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())?;

    let content_item = json!({
        "type": "ltiResourceLink",
        "title": state.lti.client_name,
        "custom": {
            "resource_id": body.resource_id,
        },
        "lineItem": {
            "scoreMaximum": 100,
            "resourceId": body.resource_id,
        },
    });

    let now = Utc::now();
    let claims = DeepLinkingResponseClaims {
        iss: &session.client_id,
        aud: &session.platform_url,
        nonce: secure_token::random_token()?,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(DEEP_LINK_MESSAGE_LIFETIME_SECS)).timestamp(),
        deployment_id: &session.deployment_id,
        message_type: "LtiDeepLinkingResponse",
        version: "1.3.0",
        content_items: vec![content_item],
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(platform.kid.clone());
    let message = encode(&header, &claims, &signing_key)?;

    let stored = state
        .id_tokens
        .load(
            &session.platform_url,
            &session.client_id,
            &session.deployment_id,
            &session.user_id,
        )?
        .ok_or(AuthError::NotFound("ID token"))?;
    let return_url = stored
        .deep_linking_settings
        .map(|settings| settings.deep_link_return_url)
        .ok_or(AuthError::NotFound("Deep link return URL"))?;

    Ok(RawHtml(render_submit_form(&return_url, &message)?))
}

/// Render the auto-submitting form posting the signed message back to
/// the platform.
fn render_submit_form(action: &str, jwt: &str) -> Result<String, AuthError> {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string(
            "deep_link_submit",
            include_str!("../../resources/forms/deep_link_submit.hbs"),
        )
        .expect("Failed to register deep link template");

    handlebars
        .render("deep_link_submit", &json!({ "action": action, "jwt": jwt }))
        .map_err(|e| AuthError::Internal(format!("Template rendering failed: {}", e)))
}
