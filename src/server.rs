//! ChatServer implementation
//!
//! Owns the shared state (client registry + Lamport clock) and the
//! broadcast engine, accepts connections, and implements the state
//! transitions triggered by each client event. One instance is built at
//! startup and handed to every connection handler by `Arc`.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::broadcast::BroadcastEngine;
use crate::client::ClientHandle;
use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::message::{ClientEvent, ServerEvent, MAX_MESSAGE_CHARS};
use crate::state::ServerState;
use crate::types::Timestamp;

/// The chat server
pub struct ChatServer {
    /// Registry and clock, behind one lock
    state: Arc<ServerState>,
    /// Fan-out over the same state
    broadcaster: BroadcastEngine,
    config: Config,
}

impl ChatServer {
    /// Create a server with empty state
    pub fn new(config: Config) -> Self {
        let state = Arc::new(ServerState::new());
        let broadcaster = BroadcastEngine::new(state.clone());
        Self {
            state,
            broadcaster,
            config,
        }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accept connections forever, one handler task per stream
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        info!("ChatServer started");

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let server = self.clone();

                    tokio::spawn(async move {
                        match handle_connection(stream, server).await {
                            Ok(()) => {}
                            Err(
                                e @ (AppError::ProtocolViolation(_)
                                | AppError::DuplicateIdentity(_)
                                | AppError::ConnectionClosed),
                            ) => {
                                warn!("Rejected connection from {}: {}", addr, e);
                            }
                            Err(e) => {
                                error!("Connection handler error for {}: {}", addr, e);
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Register a client and announce it
    ///
    /// Returns the JOIN timestamp.
    pub async fn handle_join(&self, client: &ClientHandle, remote: Timestamp) -> Result<Timestamp, AppError> {
        let timestamp = self.state.join(client.clone(), remote).await?;
        info!("JOIN: {} (ID={}) at L={}", client.name, client.id, timestamp);

        self.broadcaster
            .broadcast(&ServerEvent::joined(client, timestamp))
            .await;
        Ok(timestamp)
    }

    /// Stamp and broadcast a chat message, or reject it if too long
    ///
    /// A rejected message still advances the clock and is answered only
    /// to its sender. A message whose timestamp would overflow the clock
    /// is dropped.
    pub async fn handle_chat(&self, client: &ClientHandle, event: ClientEvent) {
        let text = event.msg.trim();
        let length = text.chars().count();
        let timestamp = match self.state.observe(event.timestamp).await {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!("Dropping message from {}: {}", client.name, e);
                return;
            }
        };

        if length > MAX_MESSAGE_CHARS {
            warn!(
                "Rejecting oversize message from {} (len={}) at L={}",
                client.name, length, timestamp
            );
            if let Err(e) = client.send(ServerEvent::oversize_rejection(length, timestamp)) {
                debug!("Could not deliver rejection to {}: {}", client.id, e);
            }
            return;
        }

        info!("Message from {}: {} (L={})", client.name, text, timestamp);
        self.broadcaster
            .broadcast(&ServerEvent::chat(client, text.to_string(), timestamp))
            .await;
    }

    /// Explicit LEAVE
    ///
    /// The notice goes to everyone active when the client left, the leaver
    /// included. Returns `Ok(false)` if the session was already gone, in
    /// which case nothing is broadcast, and `TimestampOverflow` if the
    /// frame must be dropped with the session still open.
    pub async fn handle_leave(&self, client: &ClientHandle, remote: Timestamp) -> Result<bool, AppError> {
        let Some(departure) = self.state.leave(client, remote).await? else {
            return Ok(false);
        };
        info!("LEAVE: {} (ID={}) at L={}", client.name, client.id, departure.timestamp);

        self.broadcaster
            .broadcast_to(&departure.recipients, &ServerEvent::left(client, departure.timestamp))
            .await;
        Ok(true)
    }

    /// Transport failure or stream end without LEAVE
    ///
    /// Same single-fire guarantee as [`handle_leave`](Self::handle_leave).
    pub async fn handle_disconnect(&self, client: &ClientHandle) -> bool {
        let Some(timestamp) = self.state.disconnect(client).await else {
            return false;
        };
        info!("DISCONNECT: {} (ID={}) at L={}", client.name, client.id, timestamp);

        self.broadcaster
            .broadcast(&ServerEvent::left(client, timestamp))
            .await;
        true
    }
}
