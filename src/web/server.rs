// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket assembly
//!
//! Builds the Rocket instance with every LTI route mounted and the
//! shared state registered, plus the CORS fairing and the TLS figment
//! wiring for configurations that carry certificate material.

use anyhow::Result;
use base64::Engine;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::Header;
use rocket::{async_trait, options, routes, Build, Request, Response, Rocket};
use std::path::PathBuf;

use super::state::LtiState;
use super::{deep_link, keys, launch, login, registration, services};
use crate::config::Config;

pub struct CORS;

#[async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/// Answers to OPTIONS requests
#[options("/<_path..>")]
async fn options_handler(_path: PathBuf) -> Result<(), std::io::Error> {
    Ok(())
}

/// Build the Rocket instance for the given figment and configuration.
pub async fn build_rocket(figment: Figment, config: &Config) -> Rocket<Build> {
    let state = LtiState::from_config(config);
    build_rocket_with_state(figment, state)
}

/// Build the Rocket instance around an already-wired state. The test
/// suite uses this to share stores with the assertions.
pub fn build_rocket_with_state(figment: Figment, state: LtiState) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(CORS)
        .mount(
            "/",
            routes![
                login::login_get,
                login::login_post,
                launch::launch,
                launch::deep_link_launch,
                deep_link::deep_link_resource,
                keys::keys,
                registration::registration,
                services::membership,
                services::scores,
                options_handler,
            ],
        )
        .manage(state)
}

/// Merge TLS material from the configuration into the figment.
///
/// Certificates are carried base64-encoded in the YAML file and
/// written to temporary files for Rocket to pick up.
pub fn configure_tls(figment: Figment, config: &Config) -> Result<Figment> {
    let (Some(cert), Some(key)) = (&config.server.cert, &config.server.key) else {
        return Ok(figment);
    };
    log::debug!("SSL certificates found in configuration, enabling TLS");

    let cert_data = base64::engine::general_purpose::STANDARD.decode(cert)?;
    let key_data = base64::engine::general_purpose::STANDARD.decode(key)?;

    let temp_dir = std::env::temp_dir();
    let cert_path = temp_dir.join("server.crt");
    let key_path = temp_dir.join("server.key");

    std::fs::write(&cert_path, cert_data)?;
    std::fs::write(&key_path, key_data)?;

    log::info!("TLS enabled for web server");
    Ok(figment
        .merge(("tls.certs", cert_path))
        .merge(("tls.key", key_path)))
}
