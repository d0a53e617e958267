//! Client registry
//!
//! Map from client id to registry entry. The registry has no locking of
//! its own; it is only reachable through [`ServerState`](crate::state::ServerState),
//! which keeps it behind the same lock as the Lamport clock.

use std::collections::HashMap;

use crate::client::{Client, ClientHandle};
use crate::error::AppError;
use crate::types::{ClientId, ConnectionId};

/// Connected clients keyed by id
///
/// A deactivated entry stays addressable until it is explicitly removed.
/// Removal and deactivation name the session as well as the id, so a
/// finished connection can never touch a newer one that reuses its id.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Client>,
}

impl ClientRegistry {
    /// Insert `handle` unless its id is already taken
    pub fn register(&mut self, handle: ClientHandle) -> Result<(), AppError> {
        use std::collections::hash_map::Entry;

        match self.clients.entry(handle.id) {
            Entry::Occupied(_) => Err(AppError::DuplicateIdentity(handle.id)),
            Entry::Vacant(slot) => {
                slot.insert(Client::new(handle));
                Ok(())
            }
        }
    }

    /// Remove the entry for `id` if it belongs to `session`; returns whether it did
    pub fn remove(&mut self, id: ClientId, session: ConnectionId) -> bool {
        if self.is_session(id, session) {
            self.clients.remove(&id);
            true
        } else {
            false
        }
    }

    /// Handles of every active client
    pub fn snapshot_active(&self) -> Vec<ClientHandle> {
        self.clients
            .values()
            .filter(|c| c.active)
            .map(|c| c.handle.clone())
            .collect()
    }

    /// Mark an entry as unreachable without removing it
    ///
    /// Ignored if the entry for `id` belongs to another session.
    pub fn deactivate(&mut self, id: ClientId, session: ConnectionId) {
        if let Some(client) = self.clients.get_mut(&id) {
            if client.handle.session == session {
                client.active = false;
            }
        }
    }

    /// Whether any session holds `id`
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Whether the entry for `id` belongs to `session`
    pub fn is_session(&self, id: ClientId, session: ConnectionId) -> bool {
        self.clients.get(&id).is_some_and(|c| c.handle.session == session)
    }

    /// Whether `id` is registered and still reachable
    pub fn is_active(&self, id: ClientId) -> bool {
        self.clients.get(&id).is_some_and(|c| c.active)
    }

    /// Number of registered clients, active or not
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(id: i32, name: &str) -> ClientHandle {
        let (tx, _rx) = mpsc::channel(4);
        ClientHandle::new(ClientId(id), name, tx)
    }

    #[test]
    fn test_register_and_remove() {
        let mut registry = ClientRegistry::default();
        let alice = handle(1, "Alice");
        registry.register(alice.clone()).unwrap();

        assert!(registry.contains(ClientId(1)));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(alice.id, alice.session));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_register_keeps_original() {
        let mut registry = ClientRegistry::default();
        registry.register(handle(1, "Alice")).unwrap();

        let result = registry.register(handle(1, "Mallory"));
        assert!(matches!(result, Err(AppError::DuplicateIdentity(ClientId(1)))));

        let snapshot = registry.snapshot_active();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "Alice");
    }

    #[test]
    fn test_repeated_remove_is_noop() {
        let mut registry = ClientRegistry::default();
        let alice = handle(1, "Alice");
        registry.register(alice.clone()).unwrap();

        assert!(registry.remove(alice.id, alice.session));
        assert!(!registry.remove(alice.id, alice.session));
        assert!(!registry.remove(ClientId(99), alice.session));
    }

    #[test]
    fn test_deactivated_client_skipped_but_addressable() {
        let mut registry = ClientRegistry::default();
        let alice = handle(1, "Alice");
        registry.register(alice.clone()).unwrap();
        registry.register(handle(2, "Bob")).unwrap();

        registry.deactivate(alice.id, alice.session);

        assert!(registry.contains(ClientId(1)));
        assert!(!registry.is_active(ClientId(1)));
        let snapshot = registry.snapshot_active();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, ClientId(2));

        assert!(registry.remove(alice.id, alice.session));
    }

    #[test]
    fn test_stale_session_cannot_touch_reused_id() {
        let mut registry = ClientRegistry::default();
        let old = handle(1, "Alice");
        registry.register(old.clone()).unwrap();
        assert!(registry.remove(old.id, old.session));

        let new = handle(1, "Alice");
        registry.register(new.clone()).unwrap();

        registry.deactivate(old.id, old.session);
        assert!(registry.is_active(ClientId(1)));

        assert!(!registry.remove(old.id, old.session));
        assert!(registry.contains(ClientId(1)));

        registry.deactivate(new.id, new.session);
        assert!(!registry.is_active(ClientId(1)));
    }
}
