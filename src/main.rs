//! Lamport Chat Server - Entry Point
//!
//! Binds the TCP listener and runs the ChatServer accept loop.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lamport_chat::{ChatServer, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=lamport_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lamport_chat=info")),
        )
        .init();

    // Bind address from command line overrides the environment
    let mut config = Config::from_env()?;
    if let Some(addr) = env::args().nth(1) {
        config = config.with_bind_addr(addr);
    }

    // A bind failure is fatal
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Chit Chat service listening on {}", config.bind_addr);

    Arc::new(ChatServer::new(config)).run(listener).await;

    Ok(())
}
