// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Client-credentials exchange against a mocked platform token
//! endpoint.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_lti_tool::auth::{JwksMethod, KeyStore, Platform, ServiceTokenClient};
use rust_lti_tool::storage::MemoryStore;

fn platform(token_endpoint: &str, kid: &str) -> Platform {
    Platform {
        url: "https://lms.example".to_string(),
        name: "moodle".to_string(),
        client_id: "C1".to_string(),
        authentication_endpoint: "https://lms.example/auth".to_string(),
        access_token_endpoint: token_endpoint.to_string(),
        jwks_method: JwksMethod::JwkSet,
        jwks_location: "https://lms.example/jwks".to_string(),
        kid: kid.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    aud: String,
    jti: String,
}

#[tokio::test]
async fn exchange_posts_the_assertion_and_parses_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_assertion_type="))
        .and(body_string_contains("client_assertion="))
        .and(body_string_contains("scope="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "7f41d254e2d8186a92b8c127b8ad26f4",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "https://purl.imsglobal.org/spec/lti-ags/scope/score"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = KeyStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
    let kid = keys.generate_key_pair().expect("key generation");
    let client = ServiceTokenClient::new(keys.clone(), reqwest::Client::new());

    let token = client
        .get_access_token(
            &platform(&format!("{}/token", server.uri()), &kid),
            &["https://purl.imsglobal.org/spec/lti-ags/scope/score"],
        )
        .await
        .expect("token exchange");

    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.access_token, "7f41d254e2d8186a92b8c127b8ad26f4");

    // The assertion must be signed by the platform's key pair, carry
    // its kid, and identify the tool by its assigned client id.
    let requests = server.received_requests().await.expect("recorded requests");
    let body = String::from_utf8(requests[0].body.clone()).expect("utf8 body");
    // JWT characters survive form encoding untouched, so the raw
    // field value is the assertion itself.
    let assertion = body
        .split('&')
        .find_map(|pair| pair.strip_prefix("client_assertion="))
        .expect("client_assertion field");

    let header = decode_header(assertion).expect("assertion header");
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some(kid.as_str()));

    let public_pem = keys.public_key_pem(&kid).expect("public key");
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&["C1"]);
    let data = decode::<AssertionClaims>(
        assertion,
        &DecodingKey::from_rsa_pem(public_pem.as_bytes()).expect("decoding key"),
        &validation,
    )
    .expect("assertion verifies against the stored public key");

    assert_eq!(data.claims.iss, "C1");
    assert_eq!(data.claims.sub, "C1");
    assert_eq!(data.claims.aud, "C1");
    assert_eq!(data.claims.jti.len(), 50);
}

#[tokio::test]
async fn upstream_error_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let keys = KeyStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
    let kid = keys.generate_key_pair().expect("key generation");
    let client = ServiceTokenClient::new(keys, reqwest::Client::new());

    let result = client
        .get_access_token(
            &platform(&format!("{}/token", server.uri()), &kid),
            &["https://purl.imsglobal.org/spec/lti-ags/scope/score"],
        )
        .await;
    assert!(result.is_err());
}
