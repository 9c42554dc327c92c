// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Platform-initiated login
//!
//! The platform opens the login endpoint with the issuer and client id
//! it registered under. The tool answers with a redirect to the
//! platform's authentication endpoint carrying a fresh nonce and a
//! single-use state bound to the issuer through a cookie, the state
//! half of the CSRF defense verified at launch time.

use log::debug;
use rocket::form::Form;
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::{get, post, FromForm, State};
use serde::Serialize;
use url::Url;

use super::error::ApiError;
use super::state::LtiState;
use crate::auth::{secure_token, AuthError};

/// Parameters of an OIDC third-party-initiated login.
#[derive(Debug, FromForm)]
pub struct LoginParams {
    pub iss: String,
    pub target_link_uri: String,
    pub login_hint: String,
    pub lti_message_hint: Option<String>,
    pub client_id: String,
    pub lti_deployment_id: Option<String>,
}

/// Authentication request sent back to the platform, serialized into
/// the redirect query string.
#[derive(Serialize)]
struct AuthorizationRequest<'a> {
    response_type: &'a str,
    response_mode: &'a str,
    id_token_signed_response_alg: &'a str,
    scope: &'a str,
    client_id: &'a str,
    redirect_uri: &'a str,
    login_hint: &'a str,
    nonce: &'a str,
    prompt: &'a str,
    state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lti_message_hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lti_deployment_id: Option<&'a str>,
}

#[get("/login?<params..>")]
pub async fn login_get(
    params: LoginParams,
    cookies: &CookieJar<'_>,
    state: &State<LtiState>,
) -> Result<Redirect, ApiError> {
    begin_login(params, cookies, state)
}

#[post("/login", data = "<params>")]
pub async fn login_post(
    params: Form<LoginParams>,
    cookies: &CookieJar<'_>,
    state: &State<LtiState>,
) -> Result<Redirect, ApiError> {
    begin_login(params.into_inner(), cookies, state)
}

fn begin_login(
    params: LoginParams,
    cookies: &CookieJar<'_>,
    state: &LtiState,
) -> Result<Redirect, ApiError> {
    let platform = state
        .registry
        .find(&params.iss, &params.client_id)?
        .ok_or(AuthError::PlatformNotFound)?;

    let login_state = state.launch_state.issue(cookies, &params.iss)?;
    let nonce = secure_token::random_token()?;

    let request = AuthorizationRequest {
        response_type: "id_token",
        response_mode: "form_post",
        id_token_signed_response_alg: "RS256",
        scope: "openid",
        client_id: &params.client_id,
        redirect_uri: &params.target_link_uri,
        login_hint: &params.login_hint,
        nonce: &nonce,
        prompt: "none",
        state: &login_state,
        lti_message_hint: params.lti_message_hint.as_deref(),
        lti_deployment_id: params.lti_deployment_id.as_deref(),
    };

    let mut url = Url::parse(&platform.authentication_endpoint)
        .map_err(|e| AuthError::Internal(format!("Bad authentication endpoint: {}", e)))?;
    let query = serde_urlencoded::to_string(&request)
        .map_err(|e| AuthError::Internal(format!("Query serialization failed: {}", e)))?;
    url.set_query(Some(&query));

    debug!("Redirecting login for {} to {}", params.iss, platform.authentication_endpoint);
    Ok(Redirect::found(url.to_string()))
}
