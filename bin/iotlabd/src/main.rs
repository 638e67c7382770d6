//! ---
//! iotlab_section: "01-core-functionality"
//! iotlab_subsection: "binary"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Binary entrypoint for the IoT lab service daemon."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use iotlab_api::{spawn_api_server, ApiState};
use iotlab_common::config::{AppConfig, StorageBackend};
use iotlab_common::logging::init_tracing;
use tokio::signal;
use tracing::{info, warn};

const DEFAULT_CONFIG_CANDIDATES: [&str; 1] = ["configs/iotlab.toml"];

#[derive(Debug, Parser)]
#[command(author, version, about = "IoT lab sensor and file API daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the API listen address")]
    listen: Option<SocketAddr>,

    #[arg(long, help = "Keep every resource in memory instead of on disk")]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve the API until interrupted")]
    Run,
    #[command(about = "Validate the configuration and print the effective settings")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_with_source(&[path])?,
        None => AppConfig::load_or_default(&DEFAULT_CONFIG_CANDIDATES)?,
    };
    let mut config = loaded.config;
    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }
    if cli.memory {
        config.storage.backend = StorageBackend::Memory;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            match &loaded.source {
                Some(path) => println!("# loaded from {}", path.display()),
                None => println!("# built-in defaults"),
            }
            print!("{}", config.to_toml()?);
        }
        Commands::Run => {
            init_tracing("iotlabd", &config.logging)?;
            match &loaded.source {
                Some(path) => info!(config = %path.display(), "configuration loaded"),
                None => warn!("no configuration file found; using built-in defaults"),
            }
            run_daemon(config).await?;
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let state = Arc::new(ApiState::from_storage(&config.storage)?);
    let server = spawn_api_server(state, config.api.listen)?;
    info!(address = %server.addr(), "daemon running; waiting for termination signal");

    shutdown_signal().await;
    info!("termination signal received; shutting down");
    server.shutdown().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
