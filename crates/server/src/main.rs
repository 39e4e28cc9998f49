//! Hustings - room server for party voting games
//!
//! Hosts create rooms, players join them by four-letter code, and the host
//! drives rounds while the server relays between them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hustings_core::RoomRegistry;
use hustings_net::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{ConfigError, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "hustings")]
#[command(author, version, about = "Room server for Hustings party games", long_about = None)]
struct Cli {
    /// Config file (defaults to hustings.toml in the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Net(#[from] hustings_net::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    tracing::info!("Starting Hustings");

    if let Err(e) = run(cli).await {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let (mut config, source) = ServerConfig::resolve(cli.config.as_deref())?;
    match &source {
        Some(path) => tracing::info!(path = %path.display(), "Loaded config"),
        None => tracing::info!("No config file found, using defaults"),
    }
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let registry = Arc::new(RoomRegistry::new(config.room.clone()));
    let server = Server::start(config.bind, registry, config.idle_sweep()).await?;
    tracing::info!(addr = %server.addr(), "Accepting hosts and players");

    tokio::signal::ctrl_c().await?;

    server.shutdown();
    tracing::info!(rooms = server.registry().len(), "Shutting down");
    Ok(())
}
