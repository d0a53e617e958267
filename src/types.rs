//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: client-chosen integer identity, primary key of the registry
//! - `ConnectionId`: UUID-based tag for a connection before its JOIN arrives
//! - `Timestamp`: Lamport logical time

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lamport logical timestamp
pub type Timestamp = u64;

/// Client identifier (newtype pattern)
///
/// Supplied by the client in its JOIN message. `0` is reserved for
/// server-originated replies and is never registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub i32);

impl ClientId {
    /// Sender id used for replies authored by the server itself
    pub const SERVER: ClientId = ClientId(0);

    /// Whether this id is reserved for the server
    pub fn is_reserved(self) -> bool {
        self == Self::SERVER
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-connection tag used in logs
///
/// Every accepted stream gets one, so a connection that never completes
/// its handshake can still be followed in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_server_id_reserved() {
        assert!(ClientId::SERVER.is_reserved());
        assert!(!ClientId(7).is_reserved());
    }

    #[test]
    fn test_client_id_serializes_as_integer() {
        let json = serde_json::to_string(&ClientId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
