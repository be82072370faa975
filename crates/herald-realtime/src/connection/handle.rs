//! Individual connection handle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use herald_core::Recipient;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// Result of a non-blocking enqueue onto a connection's outbound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendResult {
    /// The frame was buffered.
    Sent,
    /// The buffer is full; the consumer is too slow.
    Full,
    /// The connection is closed or its receiver is gone.
    Closed,
}

/// A handle to a single live connection.
///
/// Holds the sender side of the bounded outbound buffer, plus liveness
/// state. The transport's write pump owns the receiver and stops when the
/// handle's cancellation token fires.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Recipient who owns this connection
    pub recipient: Recipient,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<String>,
    last_heartbeat_ms: AtomicI64,
    alive: AtomicBool,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(recipient: Recipient, sender: mpsc::Sender<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recipient,
            connected_at: now,
            sender,
            last_heartbeat_ms: AtomicI64::new(now.timestamp_millis()),
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
        }
    }

    /// Registry key of the owner.
    pub fn client_id(&self) -> String {
        self.recipient.client_key()
    }

    /// Enqueue a serialized frame without waiting.
    pub fn try_send(&self, frame: String) -> TrySendResult {
        if !self.is_alive() {
            return TrySendResult::Closed;
        }
        match self.sender.try_send(frame) {
            Ok(()) => TrySendResult::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => TrySendResult::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.alive.store(false, Ordering::SeqCst);
                TrySendResult::Closed
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection closed and wake its pumps. Idempotent.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    /// Token cancelled when the connection is closed.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Record a liveness acknowledgment at `now`.
    pub fn record_heartbeat_at(&self, now: DateTime<Utc>) {
        self.last_heartbeat_ms
            .fetch_max(now.timestamp_millis(), Ordering::Relaxed);
    }

    /// Record a liveness acknowledgment now.
    pub fn record_heartbeat(&self) {
        self.record_heartbeat_at(Utc::now());
    }

    /// Last acknowledged heartbeat.
    pub fn last_heartbeat(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_heartbeat_ms.load(Ordering::Relaxed))
            .unwrap_or(self.connected_at)
    }

    /// Whether no heartbeat arrived within `timeout` before `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now - self.last_heartbeat() > timeout
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            client_id: self.client_id(),
            recipient: self.recipient,
            connected_at: self.connected_at,
            last_heartbeat: self.last_heartbeat(),
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Registry key
    pub client_id: String,
    /// Owner
    pub recipient: Recipient,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Last heartbeat
    pub last_heartbeat: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_send_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Recipient::User(1), tx);
        assert_eq!(handle.try_send("a".into()), TrySendResult::Sent);
        assert_eq!(handle.try_send("b".into()), TrySendResult::Full);
        drop(rx);
        assert_eq!(handle.try_send("c".into()), TrySendResult::Closed);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_close_cancels_token() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Recipient::Admin(1), tx);
        let token = handle.cancellation();
        handle.close();
        assert!(token.is_cancelled());
        assert_eq!(handle.try_send("x".into()), TrySendResult::Closed);
    }

    #[test]
    fn test_staleness() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Recipient::User(1), tx);
        let timeout = chrono::Duration::seconds(120);
        let now = handle.last_heartbeat();
        assert!(!handle.is_stale(now + chrono::Duration::seconds(60), timeout));
        assert!(handle.is_stale(now + chrono::Duration::seconds(121), timeout));

        handle.record_heartbeat_at(now + chrono::Duration::seconds(100));
        assert!(!handle.is_stale(now + chrono::Duration::seconds(121), timeout));
    }
}
