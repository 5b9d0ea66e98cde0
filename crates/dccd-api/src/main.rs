//! DCCD archive service binary.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! dccd --config config.yaml
//!
//! # With environment variables only
//! DCCD_SERVER__PORT=8081 dccd
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dccd_api::http::{create_router, AppState};
use dccd_server::ServerConfig;
use dccd_storage::{MemoryArchiveStore, MemoryUserStore};

/// DCCD - dendrochronological-data archive REST service
#[derive(Parser, Debug)]
#[command(name = "dccd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting DCCD archive service");

    let archive = Arc::new(MemoryArchiveStore::new()?);
    let users = Arc::new(MemoryUserStore::new());
    info!("Using in-memory archive backends");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(Arc::clone(&archive), archive, users, config);
    let router = create_router(state);

    info!(%addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_logging(config: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
    } else {
        info!("Shutdown signal received");
    }
}
