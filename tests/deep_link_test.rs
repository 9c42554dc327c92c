// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Deep-link resource selection: the signed `LtiDeepLinkingResponse`
//! posted back to the platform.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

use rust_lti_tool::auth::{IdTokenClaims, JwksMethod, KeyStore, Platform};
use rust_lti_tool::config::Config;
use rust_lti_tool::storage::MemoryStore;
use rust_lti_tool::web::{build_rocket_with_state, LtiState};

const ISSUER: &str = "https://lms.example";
const CLIENT_ID: &str = "C1";
const RETURN_URL: &str = "https://lms.example/deep-link-return";

struct Fixture {
    client: Client,
    tool_token: String,
    keys: KeyStore,
    kid: String,
}

async fn fixture(with_deep_link_settings: bool) -> Fixture {
    let state = LtiState::with_stores(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    );

    let kid = state.keys.generate_key_pair().expect("key generation");
    state
        .registry
        .register(&Platform {
            url: ISSUER.to_string(),
            name: "moodle".to_string(),
            client_id: CLIENT_ID.to_string(),
            authentication_endpoint: format!("{}/auth", ISSUER),
            access_token_endpoint: format!("{}/token", ISSUER),
            jwks_method: JwksMethod::JwkSet,
            jwks_location: format!("{}/jwks", ISSUER),
            kid: kid.clone(),
        })
        .expect("platform registration");

    let mut claims = json!({
        "iss": ISSUER,
        "aud": CLIENT_ID,
        "sub": "user-4",
        "nonce": "n-1",
        "iat": 1_716_983_501,
        "exp": 1_716_983_561,
        "https://purl.imsglobal.org/spec/lti/claim/deployment_id": "4",
        "https://purl.imsglobal.org/spec/lti/claim/message_type": "LtiDeepLinkingRequest",
    });
    if with_deep_link_settings {
        claims["https://purl.imsglobal.org/spec/lti-dl/claim/deep_linking_settings"] =
            json!({ "deep_link_return_url": RETURN_URL });
    }
    let claims: IdTokenClaims = serde_json::from_value(claims).expect("claims fixture");
    state.id_tokens.save(&claims).expect("claims persisted");

    let tool_token = state.tool_tokens.issue_for(&claims).expect("tool token");
    let keys = state.keys.clone();

    let figment = rocket::Config::figment()
        .merge(("port", 0))
        .merge(("address", "127.0.0.1"))
        .merge(("log_level", rocket::config::LogLevel::Off));
    let client = Client::untracked(build_rocket_with_state(figment, state))
        .await
        .expect("valid rocket instance");

    Fixture {
        client,
        tool_token,
        keys,
        kid,
    }
}

/// Pull the JWT out of the auto-submitting form.
fn form_jwt(html: &str) -> String {
    html.split("name=\"JWT\" value=\"")
        .nth(1)
        .expect("JWT input in form")
        .split('"')
        .next()
        .expect("closing quote")
        .to_string()
}

#[tokio::test]
async fn selection_returns_a_signed_deep_linking_response_form() {
    let fixture = fixture(true).await;

    let response = fixture
        .client
        .post("/deep-link-resource")
        .header(ContentType::JSON)
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", fixture.tool_token),
        ))
        .body(json!({ "resourceId": 2 }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let html = response.into_string().await.expect("form body");
    assert!(html.contains(&format!("action=\"{}\"", RETURN_URL)));

    let message = form_jwt(&html);
    let header = decode_header(&message).expect("message header");
    assert_eq!(header.kid.as_deref(), Some(fixture.kid.as_str()));

    // The message verifies against the platform's stored public key
    // and carries the content item for the selected resource.
    let public_pem = fixture
        .keys
        .public_key_pem(&fixture.kid)
        .expect("public key");
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[ISSUER]);
    let data = decode::<Value>(
        &message,
        &DecodingKey::from_rsa_pem(public_pem.as_bytes()).expect("decoding key"),
        &validation,
    )
    .expect("message verifies");

    let claims = data.claims;
    assert_eq!(claims["iss"], CLIENT_ID);
    assert_eq!(
        claims["https://purl.imsglobal.org/spec/lti/claim/message_type"],
        "LtiDeepLinkingResponse"
    );
    assert_eq!(
        claims["https://purl.imsglobal.org/spec/lti/claim/version"],
        "1.3.0"
    );
    let item = &claims["https://purl.imsglobal.org/spec/lti-dl/claim/content_items"][0];
    assert_eq!(item["type"], "ltiResourceLink");
    assert_eq!(item["custom"]["resource_id"], 2);
    assert_eq!(item["lineItem"]["scoreMaximum"], 100);
}

#[tokio::test]
async fn selection_without_stored_deep_link_settings_is_not_found() {
    let fixture = fixture(false).await;

    let response = fixture
        .client
        .post("/deep-link-resource")
        .header(ContentType::JSON)
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", fixture.tool_token),
        ))
        .body(json!({ "resourceId": 2 }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[tokio::test]
async fn malformed_selection_body_is_a_bad_request() {
    let fixture = fixture(true).await;

    let response = fixture
        .client
        .post("/deep-link-resource")
        .header(ContentType::JSON)
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", fixture.tool_token),
        ))
        .body("{\"resourceId\": \"not-a-number\"}")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}
