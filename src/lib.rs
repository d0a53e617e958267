//! Lamport Chat Server Library
//!
//! A WebSocket broadcast chat server built with tokio-tungstenite. Every
//! event the server processes is stamped with a Lamport logical timestamp,
//! so all participants agree on a causal order without synchronized clocks.
//!
//! # Features
//! - JOIN handshake with client-chosen ids (duplicates rejected)
//! - Broadcast of chat messages to every connected client
//! - 128-character message limit with a direct rejection to the sender
//! - Exactly one LEAVE notice per session, explicit or on disconnect
//!
//! # Architecture
//! - `ServerState` keeps the client registry and the Lamport clock behind
//!   one lock; nothing else can reach either
//! - `BroadcastEngine` snapshots active clients and enqueues without the lock
//! - Each connection has a receive task and a writer task draining a
//!   bounded per-client queue into the socket
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use lamport_chat::{ChatServer, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     Arc::new(ChatServer::new(config)).run(listener).await;
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
mod registry;
pub mod server;
pub mod state;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{BroadcastEngine, BroadcastReport};
pub use client::ClientHandle;
pub use clock::LamportClock;
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{ClientEvent, EventType, ServerEvent, MAX_MESSAGE_CHARS};
pub use server::ChatServer;
pub use state::{Departure, ServerState};
pub use types::{ClientId, ConnectionId, Timestamp};
