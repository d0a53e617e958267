//! Error types for the chat server
//!
//! Defines connection-level errors and outbound queue errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::{ClientId, Timestamp};

/// Application-level errors
///
/// Errors stay with the connection that produced them. All but
/// `TimestampOverflow` end that connection; an overflowing frame is
/// dropped and the session continues.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (transport failure)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (transport failure)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer broke the handshake rules (first message not JOIN, reserved id, ...)
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A client with this id is already registered
    #[error("Client id {0} is already connected")]
    DuplicateIdentity(ClientId),

    /// Client timestamp would push the logical clock past its maximum
    #[error("Timestamp {0} would overflow the logical clock")]
    TimestampOverflow(Timestamp),

    /// Stream ended before the handshake completed
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Outbound queue errors
///
/// Returned when enqueueing an event for a client fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The client's writer has stopped; the queue can never drain again
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not keeping up; this event was dropped for it
    #[error("Outbound queue full")]
    QueueFull,
}
