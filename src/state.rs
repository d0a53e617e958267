//! Shared server state
//!
//! The client registry and the Lamport clock live behind one lock and are
//! only reachable through the operations below. Every operation is a
//! single short critical section with no I/O, so a registry change and
//! the clock step it causes are always observed together.

use tokio::sync::Mutex;

use crate::client::ClientHandle;
use crate::clock::LamportClock;
use crate::error::AppError;
use crate::registry::ClientRegistry;
use crate::types::{ClientId, ConnectionId, Timestamp};

#[derive(Debug, Default)]
struct Inner {
    clients: ClientRegistry,
    clock: LamportClock,
}

/// A client's explicit LEAVE, stamped and ready to announce
#[derive(Debug)]
pub struct Departure {
    /// LEAVE timestamp
    pub timestamp: Timestamp,
    /// Active clients at the moment of leaving, the leaver included
    pub recipients: Vec<ClientHandle>,
}

/// Registry and clock, updated atomically together
#[derive(Debug, Default)]
pub struct ServerState {
    inner: Mutex<Inner>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and stamp its JOIN
    ///
    /// Fails with `DuplicateIdentity` if the id is taken, or with
    /// `ProtocolViolation` if `remote` would overflow the clock. Neither
    /// the registry nor the clock changes on failure.
    pub async fn join(&self, handle: ClientHandle, remote: Timestamp) -> Result<Timestamp, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.clients.contains(handle.id) {
            return Err(AppError::DuplicateIdentity(handle.id));
        }
        let timestamp = inner
            .clock
            .observe(remote)
            .ok_or_else(|| AppError::ProtocolViolation(format!("JOIN timestamp {} overflows the clock", remote)))?;
        inner.clients.register(handle)?;
        Ok(timestamp)
    }

    /// Merge a client-supplied timestamp into the clock
    pub async fn observe(&self, remote: Timestamp) -> Result<Timestamp, AppError> {
        self.inner
            .lock()
            .await
            .clock
            .observe(remote)
            .ok_or(AppError::TimestampOverflow(remote))
    }

    /// Explicit LEAVE: observe `remote`, snapshot recipients, then remove
    ///
    /// Returns `Ok(None)` if this session was already removed. An
    /// overflowing `remote` leaves the client registered.
    pub async fn leave(&self, client: &ClientHandle, remote: Timestamp) -> Result<Option<Departure>, AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.clients.is_session(client.id, client.session) {
            return Ok(None);
        }
        let timestamp = inner
            .clock
            .observe(remote)
            .ok_or(AppError::TimestampOverflow(remote))?;
        let recipients = inner.clients.snapshot_active();
        inner.clients.remove(client.id, client.session);
        Ok(Some(Departure {
            timestamp,
            recipients,
        }))
    }

    /// Implicit disconnect: remove this session and tick
    ///
    /// Returns the LEAVE timestamp only if this call removed the entry and
    /// the clock could still advance. The entry is removed either way.
    pub async fn disconnect(&self, client: &ClientHandle) -> Option<Timestamp> {
        let mut inner = self.inner.lock().await;
        if inner.clients.remove(client.id, client.session) {
            inner.clock.tick()
        } else {
            None
        }
    }

    /// Handles of every active client, taken under the lock
    pub async fn snapshot_active(&self) -> Vec<ClientHandle> {
        self.inner.lock().await.clients.snapshot_active()
    }

    /// Skip `id` in future broadcasts, if it still belongs to `session`
    pub async fn deactivate(&self, id: ClientId, session: ConnectionId) {
        self.inner.lock().await.clients.deactivate(id, session);
    }

    /// Whether `id` is registered
    pub async fn contains(&self, id: ClientId) -> bool {
        self.inner.lock().await.clients.contains(id)
    }

    /// Whether `id` is registered and reachable
    pub async fn is_active(&self, id: ClientId) -> bool {
        self.inner.lock().await.clients.is_active(id)
    }

    /// Number of registered clients
    pub async fn len(&self) -> usize {
        self.inner.lock().await.clients.len()
    }

    /// Whether no client is registered
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.clients.is_empty()
    }

    /// Current clock value
    pub async fn now(&self) -> Timestamp {
        self.inner.lock().await.clock.now()
    }
}
