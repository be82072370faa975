//! Connection hub counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hub-level counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    connections_replaced: AtomicU64,
    connections_evicted: AtomicU64,
    connections_overflowed: AtomicU64,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    frames_received: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection registered.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection left the registry.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection was replaced by a newer one for the same recipient.
    pub fn connection_replaced(&self) {
        self.connections_replaced.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection was evicted for missing heartbeats.
    pub fn connection_evicted(&self) {
        self.connections_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection was torn down because its buffer was full.
    pub fn connection_overflowed(&self) {
        self.connections_overflowed.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame was buffered for a client.
    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame could not be buffered.
    pub fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame arrived from a client.
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self, connections_active: usize) -> RealtimeMetricsSnapshot {
        RealtimeMetricsSnapshot {
            connections_active: connections_active as u64,
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections_replaced: self.connections_replaced.load(Ordering::Relaxed),
            connections_evicted: self.connections_evicted.load(Ordering::Relaxed),
            connections_overflowed: self.connections_overflowed.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
        }
    }
}

/// Serializable counter snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMetricsSnapshot {
    /// Currently registered connections
    pub connections_active: u64,
    /// Connections ever registered
    pub connections_opened: u64,
    /// Connections removed for any reason
    pub connections_closed: u64,
    /// Connections replaced by a newer one
    pub connections_replaced: u64,
    /// Connections evicted for missing heartbeats
    pub connections_evicted: u64,
    /// Connections dropped on buffer overflow
    pub connections_overflowed: u64,
    /// Frames buffered for clients
    pub frames_sent: u64,
    /// Frames that could not be buffered
    pub frames_dropped: u64,
    /// Frames received from clients
    pub frames_received: u64,
}
