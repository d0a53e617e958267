//! Client struct definition
//!
//! Represents a connected client with its identity and outbound queue.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerEvent;
use crate::types::{ClientId, ConnectionId};

/// Sendable reference to a connected client
///
/// Cloned into registry snapshots so the broadcaster can enqueue events
/// without holding the registry lock. The queue is drained by the
/// connection's single writer task, so concurrent senders never touch
/// the socket directly.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// Client-supplied identity
    pub id: ClientId,
    /// Trimmed display name
    pub name: String,
    /// Connection this handle belongs to; tells apart sessions reusing an id
    pub session: ConnectionId,
    /// Server → Client outbound queue
    sender: mpsc::Sender<ServerEvent>,
}

impl ClientHandle {
    /// Create a handle for a fresh session; `name` is trimmed here
    pub fn new(id: ClientId, name: &str, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            session: ConnectionId::new(),
            sender,
        }
    }

    /// Tie the handle to an existing connection
    pub fn with_session(mut self, session: ConnectionId) -> Self {
        self.session = session;
        self
    }

    /// Enqueue an event for this client without waiting
    ///
    /// A full queue drops the event for this client only.
    pub fn send(&self, event: ServerEvent) -> Result<(), SendError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

/// Registry entry for a connected client
#[derive(Debug)]
pub struct Client {
    /// How to reach the client
    pub handle: ClientHandle,
    /// Cleared after a failed send; inactive clients are skipped by broadcasts
    pub active: bool,
}

impl Client {
    /// Create an active entry
    pub fn new(handle: ClientHandle) -> Self {
        Self {
            handle,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_trims_name() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = ClientHandle::new(ClientId(1), "  Alice \n", tx);
        assert_eq!(handle.name, "Alice");
    }

    #[test]
    fn test_new_client_is_active() {
        let (tx, _rx) = mpsc::channel(4);
        let client = Client::new(ClientHandle::new(ClientId(1), "Alice", tx));
        assert!(client.active);
    }

    #[tokio::test]
    async fn test_send_enqueues_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ClientHandle::new(ClientId(1), "Alice", tx);

        handle.send(ServerEvent::oversize_rejection(200, 1)).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.timestamp, 1);
    }

    #[test]
    fn test_send_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ClientHandle::new(ClientId(1), "Alice", tx);

        handle.send(ServerEvent::oversize_rejection(200, 1)).unwrap();
        let result = handle.send(ServerEvent::oversize_rejection(200, 2));
        assert_eq!(result, Err(SendError::QueueFull));
    }

    #[test]
    fn test_send_closed_queue() {
        let (tx, rx) = mpsc::channel(1);
        let handle = ClientHandle::new(ClientId(1), "Alice", tx);
        drop(rx);

        let result = handle.send(ServerEvent::oversize_rejection(200, 1));
        assert_eq!(result, Err(SendError::ChannelClosed));
    }
}
