//! Connection registry: live connections indexed by recipient key and id.

use std::sync::Arc;

use dashmap::DashMap;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe map of live connections, at most one per recipient.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Recipient key (`user-{id}` / `admin-{id}`) → handle.
    by_key: DashMap<String, Arc<ConnectionHandle>>,
    /// Connection ID → recipient key.
    by_id: DashMap<ConnectionId, String>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle`, returning the connection it replaced, if any.
    pub fn insert(&self, handle: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let key = handle.client_id();
        self.by_id.insert(handle.id, key.clone());
        let previous = self.by_key.insert(key, handle);
        if let Some(prev) = &previous {
            self.by_id.remove(&prev.id);
        }
        previous
    }

    /// Remove `conn_id` if it is still the registered connection for its key.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, key) = self.by_id.remove(conn_id)?;
        self.by_key
            .remove_if(&key, |_, handle| handle.id == *conn_id)
            .map(|(_, handle)| handle)
    }

    /// Connection registered under `key`.
    pub fn get(&self, key: &str) -> Option<Arc<ConnectionHandle>> {
        self.by_key.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Connection with id `conn_id`.
    pub fn get_by_id(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let key = self.by_id.get(conn_id)?.value().clone();
        self.get(&key).filter(|h| h.id == *conn_id)
    }

    /// Snapshot of every connection.
    pub fn all(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_key
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Remove every connection and return them.
    pub fn drain(&self) -> Vec<Arc<ConnectionHandle>> {
        let all = self.all();
        for handle in &all {
            self.remove(&handle.id);
        }
        all
    }
}
