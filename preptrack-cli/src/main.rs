mod authenticator;
mod cli;
mod commands;
mod config;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use crate::config::{session_storage, PrepConfig};
use preptrack::{ClientError, LoginRedirect, PrepClient};

/// Protected calls that hit an expired session end up here.
struct TerminalRedirect;

impl LoginRedirect for TerminalRedirect {
    fn redirect_to_login(&self) {
        eprintln!("Session expired. Run `preptrack login` to sign in again.");
    }
}

/// The redirect has already told the user to sign in again.
fn is_session_expired(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_session_expired)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    match run().await {
        Err(err) if is_session_expired(&err) => {
            tracing::debug!("Exiting after expired session: {:#}", err);
            std::process::exit(1);
        }
        result => result,
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::ConfigPath = cli.command {
        let path = PrepConfig::config_path()?;
        if PrepConfig::ensure_file(&path)? {
            println!("Created default config at {}", path.display());
        } else {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = PrepConfig::load()?;
    tracing::debug!("Using auth service at {} and API at {}", config.auth_base_url, config.api_base_url);
    let client = PrepClient::new(
        &config.client_config(),
        session_storage()?,
        Arc::new(TerminalRedirect),
    )
    .context("Invalid service configuration")?;
    client.session().hydrate();

    commands::run(cli.command, &client, &config).await
}
