//! Line-based 1:1 chat server - Entry Point
//!
//! Starts the TCP listener and Server actor, accepting connections.

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pair_chat::{accept_loop, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=pair_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pair_chat=info")),
        )
        .init();

    let config = ServerConfig::parse();

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Chat server listening on {}", config.addr);

    // Create Server actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    tokio::spawn(Server::new(cmd_rx).run());

    accept_loop(listener, cmd_tx, config.limits()).await;

    Ok(())
}
