//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol. Both directions carry an
//! explicit `type` field with one of the three event kinds.

use serde::{Deserialize, Serialize};

use crate::client::ClientHandle;
use crate::types::{ClientId, Timestamp};

/// Maximum length of a chat message, counted in characters after trimming
pub const MAX_MESSAGE_CHARS: usize = 128;

/// Display name used for replies authored by the server
pub const SERVER_NAME: &str = "Server";

/// Protocol event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Connection start
    Join,
    /// Chat text
    Message,
    /// Voluntary or involuntary connection end
    Leave,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventType::Join => "JOIN",
            EventType::Message => "MESSAGE",
            EventType::Leave => "LEAVE",
        };
        f.write_str(name)
    }
}

/// Client → Server message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEvent {
    /// Sender identity, unique among connected clients
    pub id: ClientId,
    /// Display name (trimmed server-side)
    pub client_name: String,
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Sender's local Lamport time
    pub timestamp: Timestamp,
    /// Chat text (trimmed server-side)
    #[serde(default)]
    pub msg: String,
}

impl ClientEvent {
    /// Build an outgoing event for the given client
    pub fn new(
        id: ClientId,
        client_name: impl Into<String>,
        event_type: EventType,
        timestamp: Timestamp,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            id,
            client_name: client_name.into(),
            event_type,
            timestamp,
            msg: msg.into(),
        }
    }
}

/// Server → Client message
///
/// Used both for broadcasts and for direct replies to a single client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    /// Originating client, or `0` for the server itself
    pub sender_id: ClientId,
    /// Originating client's display name
    pub sender_name: String,
    /// Human-readable event text
    pub msg_stream: String,
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Server-assigned Lamport time
    pub timestamp: Timestamp,
}

impl ServerEvent {
    /// Notice that `client` joined at `timestamp`
    pub fn joined(client: &ClientHandle, timestamp: Timestamp) -> Self {
        Self {
            sender_id: client.id,
            sender_name: client.name.clone(),
            msg_stream: format!(
                "Participant {} joined Chit Chat at logical time L={}",
                client.name, timestamp
            ),
            event_type: EventType::Join,
            timestamp,
        }
    }

    /// Chat text from `client`, stamped with `timestamp`
    pub fn chat(client: &ClientHandle, text: String, timestamp: Timestamp) -> Self {
        Self {
            sender_id: client.id,
            sender_name: client.name.clone(),
            msg_stream: text,
            event_type: EventType::Message,
            timestamp,
        }
    }

    /// Notice that `client` left at `timestamp`
    pub fn left(client: &ClientHandle, timestamp: Timestamp) -> Self {
        Self {
            sender_id: client.id,
            sender_name: client.name.clone(),
            msg_stream: format!(
                "Participant {} left Chit Chat at logical time L={}",
                client.name, timestamp
            ),
            event_type: EventType::Leave,
            timestamp,
        }
    }

    /// Direct reply telling a sender that its message of `length` chars was dropped
    pub fn oversize_rejection(length: usize, timestamp: Timestamp) -> Self {
        Self {
            sender_id: ClientId::SERVER,
            sender_name: SERVER_NAME.to_string(),
            msg_stream: format!(
                "Message too long ({} chars). Limit is {}.",
                length, MAX_MESSAGE_CHARS
            ),
            event_type: EventType::Message,
            timestamp,
        }
    }

    /// One-line console rendering used by the interactive client
    pub fn display_line(&self) -> String {
        format!(
            "[{} @ L={}] {}",
            self.sender_name, self.timestamp, self.msg_stream
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_deserialize() {
        let json = r#"{"id": 3, "clientName": " Alice ", "type": "MESSAGE", "timestamp": 9, "msg": "hi"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, ClientId(3));
        assert_eq!(event.client_name, " Alice ");
        assert_eq!(event.event_type, EventType::Message);
        assert_eq!(event.timestamp, 9);
        assert_eq!(event.msg, "hi");
    }

    #[test]
    fn test_client_event_msg_defaults_to_empty() {
        let json = r#"{"id": 3, "clientName": "Alice", "type": "JOIN", "timestamp": 0}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, EventType::Join);
        assert!(event.msg.is_empty());
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let json = r#"{"id": 3, "clientName": "Alice", "type": "TYPING", "timestamp": 0}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }

    #[test]
    fn test_server_event_serialize() {
        let event = ServerEvent::oversize_rejection(130, 12);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"senderId\":0"));
        assert!(json.contains("\"senderName\":\"Server\""));
        assert!(json.contains("\"type\":\"MESSAGE\""));
        assert!(json.contains("\"timestamp\":12"));
        assert!(json.contains("Message too long (130 chars). Limit is 128."));
    }

    #[test]
    fn test_display_line() {
        let event = ServerEvent::oversize_rejection(200, 4);
        assert_eq!(
            event.display_line(),
            "[Server @ L=4] Message too long (200 chars). Limit is 128."
        );
    }
}
