//! Match-3 game server.

use anyhow::Context;
use match3_core::LevelConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod server;
mod session;

use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    let config = match std::env::var("LEVEL_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => LevelConfig::default(),
    };

    info!(?config, "Starting match-3 server...");

    let state = Arc::new(ServerState::new(config));

    server::run_server(addr, state).await
}

fn load_config(path: &str) -> anyhow::Result<LevelConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read level config {}", path))?;
    let config =
        LevelConfig::from_json(&json).with_context(|| format!("invalid level config {}", path))?;
    Ok(config)
}
