//! Blind preference study command line.

mod commands;
mod config;
mod error;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::Commands;
use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "blindpair", version, about = "Blind side-by-side video preference studies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for terminals, JSON when LOG_FORMAT=json
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("blindpair=info".parse().context("invalid log directive")?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // TLS for the GitHub client; a provider may already be installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialise logging: {:#}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let env = CliConfig::from_env();
    info!("Starting blindpair");

    match commands::dispatch(cli.command, &env).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
