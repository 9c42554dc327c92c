// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the LTI tool server
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rocket::{
    config::LogLevel,
    data::{Limits, ToByteUnit},
};

use rust_lti_tool::config::{output_config_schema, Config};
use rust_lti_tool::web::{build_rocket, configure_tls};

/// LTI 1.3 tool provider server
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Web server address (overrides the configuration)
    #[arg(short, long)]
    web_address: Option<String>,

    /// Web server port (overrides the configuration)
    #[arg(short = 'p', long)]
    web_port: Option<u16>,

    /// Session token secret (overrides the configuration)
    #[arg(long)]
    jwt_secret: Option<String>,

    /// Public URL of this tool (overrides the configuration)
    #[arg(long)]
    server_url: Option<String>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.show_config_schema {
        return output_config_schema();
    }

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(
        args.web_port,
        args.web_address,
        args.jwt_secret,
        args.server_url,
    );

    println!(
        "LTI tool server listening on {}:{}",
        config.server.address, config.server.port
    );
    println!("Public URL: {}", config.lti.server_url);

    let figment = rocket::Config::figment()
        .merge((
            "ident",
            format!("{}/{}", config.server.name, env!("CARGO_PKG_VERSION")),
        ))
        .merge(("limits", Limits::new().limit("json", 2.mebibytes())))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("log_level", LogLevel::Normal));
    let figment = configure_tls(figment, &config)?;

    let rocket = build_rocket(figment, &config).await;
    let ignited = rocket.ignite().await?;
    ignited.launch().await?;

    Ok(())
}
