//! The connection hub: at-most-once, best-effort fan-out to live clients.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use herald_core::config::RealtimeConfig;
use herald_core::{AppError, AppResult, Recipient};

use crate::connection::heartbeat;
use crate::connection::{ConnectionHandle, ConnectionId, ConnectionInfo, ConnectionRegistry, TrySendResult};
use crate::message::serializer::serialize_outbound;
use crate::message::types::OutboundFrame;
use crate::metrics::{RealtimeMetrics, RealtimeMetricsSnapshot};

/// Result of a targeted send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Enqueued on the recipient's live connection.
    Sent,
    /// The recipient has no live connection (or the hub is stopped).
    Offline,
    /// The connection could not keep up and was torn down.
    Dropped,
}

impl SendOutcome {
    /// Whether the frame reached the recipient's buffer.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Registry of live connections plus the background liveness loops.
///
/// Producers never block here: frames go through `try_send`, and a full
/// buffer disconnects the consumer.
#[derive(Debug)]
pub struct Hub {
    registry: ConnectionRegistry,
    metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
    running: AtomicBool,
    started: AtomicBool,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl Hub {
    /// Create a hub that accepts registrations immediately. Call
    /// [`Hub::start`] to run the heartbeat and stale sweep loops.
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            metrics: Arc::new(RealtimeMetrics::new()),
            config,
            running: AtomicBool::new(true),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Hub configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Shared counters.
    pub fn metrics(&self) -> &Arc<RealtimeMetrics> {
        &self.metrics
    }

    /// Counter snapshot including the current connection count.
    pub fn metrics_snapshot(&self) -> RealtimeMetricsSnapshot {
        self.metrics.snapshot(self.registry.len())
    }

    /// Whether the hub accepts registrations and sends.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register a connection for `recipient`.
    ///
    /// An existing connection for the same recipient is evicted and closed.
    pub fn register(
        &self,
        recipient: Recipient,
    ) -> AppResult<(Arc<ConnectionHandle>, mpsc::Receiver<String>)> {
        if !self.is_running() {
            return Err(AppError::service_unavailable("Connection hub is not running"));
        }

        let (tx, rx) = mpsc::channel(self.config.outbound_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(recipient, tx));

        if let Some(previous) = self.registry.insert(Arc::clone(&handle)) {
            previous.close();
            self.metrics.connection_replaced();
            self.metrics.connection_closed();
            info!(
                conn_id = %previous.id,
                client_id = %handle.client_id(),
                "Connection replaced by newer registration"
            );
        }

        self.metrics.connection_opened();
        info!(
            conn_id = %handle.id,
            client_id = %handle.client_id(),
            "Connection registered"
        );

        Ok((handle, rx))
    }

    /// Remove and close `conn_id`. Returns false if it was not registered.
    pub fn unregister(&self, conn_id: &ConnectionId) -> bool {
        match self.registry.remove(conn_id) {
            Some(handle) => {
                handle.close();
                self.metrics.connection_closed();
                info!(
                    conn_id = %conn_id,
                    client_id = %handle.client_id(),
                    "Connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Send `frame` to `recipient`'s live connection.
    pub fn send_to(&self, recipient: &Recipient, frame: &OutboundFrame) -> SendOutcome {
        if !self.is_running() {
            return SendOutcome::Offline;
        }
        let Some(handle) = self.registry.get(&recipient.client_key()) else {
            return SendOutcome::Offline;
        };
        let payload = match serialize_outbound(frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(kind = frame.kind(), error = %e, "Failed to serialize frame");
                self.metrics.frame_dropped();
                return SendOutcome::Dropped;
            }
        };
        self.deliver(&handle, payload)
    }

    /// Send `frame` to every connection. Returns how many it was enqueued on.
    pub fn broadcast_all(&self, frame: &OutboundFrame) -> usize {
        self.broadcast_where(frame, |_| true)
    }

    /// Send `frame` to every user connection.
    pub fn broadcast_users(&self, frame: &OutboundFrame) -> usize {
        self.broadcast_where(frame, Recipient::is_user)
    }

    /// Send `frame` to every admin connection.
    pub fn broadcast_admins(&self, frame: &OutboundFrame) -> usize {
        self.broadcast_where(frame, Recipient::is_admin)
    }

    /// Whether `recipient` has a live connection.
    pub fn is_connected(&self, recipient: &Recipient) -> bool {
        self.registry
            .get(&recipient.client_key())
            .is_some_and(|handle| handle.is_alive())
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Recipients with a registered connection.
    pub fn connected_recipients(&self) -> Vec<Recipient> {
        self.registry.all().iter().map(|h| h.recipient).collect()
    }

    /// Info snapshots for every connection.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.registry.all().iter().map(|h| h.info()).collect()
    }

    /// Record a liveness acknowledgment for `conn_id`.
    pub fn record_heartbeat(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.registry.get_by_id(conn_id) {
            handle.record_heartbeat();
        }
    }

    /// Send a `ping` to every connection.
    pub fn ping_all(&self) -> usize {
        self.broadcast_all(&OutboundFrame::ping())
    }

    /// Evict connections whose last heartbeat is older than the configured
    /// timeout relative to `now`.
    pub fn evict_stale(&self, now: DateTime<Utc>) -> usize {
        let timeout = chrono::Duration::seconds(
            i64::try_from(self.config.heartbeat_timeout_seconds).unwrap_or(i64::MAX / 1000),
        );
        let mut evicted = 0;
        for handle in self.registry.all() {
            if handle.is_stale(now, timeout) && self.registry.remove(&handle.id).is_some() {
                handle.close();
                self.metrics.connection_evicted();
                self.metrics.connection_closed();
                warn!(
                    conn_id = %handle.id,
                    client_id = %handle.client_id(),
                    last_heartbeat = %handle.last_heartbeat(),
                    "Evicting stale connection"
                );
                evicted += 1;
            }
        }
        evicted
    }

    /// Spawn the heartbeat and stale sweep loops. Subsequent calls do nothing.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let ping_period = Duration::from_secs(self.config.ping_interval_seconds.max(1));
        let sweep_period = Duration::from_secs(self.config.stale_sweep_interval_seconds.max(1));

        self.tasks.spawn(heartbeat::ping_loop(
            Arc::clone(self),
            ping_period,
            self.cancel.clone(),
        ));
        self.tasks.spawn(heartbeat::stale_sweep_loop(
            Arc::clone(self),
            sweep_period,
            self.cancel.clone(),
        ));

        info!(
            ping_interval_secs = ping_period.as_secs(),
            sweep_interval_secs = sweep_period.as_secs(),
            "Connection hub started"
        );
    }

    /// Stop the loops, close every connection, and refuse further work.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        let closed = self.registry.drain();
        for handle in &closed {
            handle.close();
            self.metrics.connection_closed();
        }

        info!(closed = closed.len(), "Connection hub stopped");
    }

    fn broadcast_where(&self, frame: &OutboundFrame, matches: impl Fn(&Recipient) -> bool) -> usize {
        if !self.is_running() {
            return 0;
        }
        let payload = match serialize_outbound(frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(kind = frame.kind(), error = %e, "Failed to serialize frame");
                return 0;
            }
        };

        self.registry
            .all()
            .iter()
            .filter(|handle| matches(&handle.recipient))
            .filter(|handle| self.deliver(handle, payload.clone()).is_sent())
            .count()
    }

    fn deliver(&self, handle: &Arc<ConnectionHandle>, payload: String) -> SendOutcome {
        match handle.try_send(payload) {
            TrySendResult::Sent => {
                self.metrics.frame_sent();
                SendOutcome::Sent
            }
            TrySendResult::Full => {
                self.metrics.frame_dropped();
                self.metrics.connection_overflowed();
                warn!(
                    conn_id = %handle.id,
                    client_id = %handle.client_id(),
                    "Outbound buffer full, disconnecting slow consumer"
                );
                self.unregister(&handle.id);
                SendOutcome::Dropped
            }
            TrySendResult::Closed => {
                self.metrics.frame_dropped();
                debug!(conn_id = %handle.id, "Send on closed connection");
                self.unregister(&handle.id);
                SendOutcome::Offline
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub_with_buffer(size: usize) -> Hub {
        Hub::new(RealtimeConfig {
            outbound_buffer_size: size,
            ..Default::default()
        })
    }

    #[test]
    fn test_send_to_offline_recipient() {
        let hub = hub_with_buffer(4);
        assert_eq!(
            hub.send_to(&Recipient::User(9), &OutboundFrame::ping()),
            SendOutcome::Offline
        );
    }

    #[test]
    fn test_slow_consumer_is_disconnected_without_affecting_others() {
        let hub = hub_with_buffer(1);
        let (slow, _slow_rx) = hub.register(Recipient::User(1)).unwrap();
        let (_fast, mut fast_rx) = hub.register(Recipient::User(2)).unwrap();

        assert!(hub.send_to(&Recipient::User(1), &OutboundFrame::ping()).is_sent());
        assert_eq!(
            hub.send_to(&Recipient::User(1), &OutboundFrame::ping()),
            SendOutcome::Dropped
        );
        assert!(!hub.is_connected(&Recipient::User(1)));
        assert!(slow.cancellation().is_cancelled());

        assert_eq!(hub.broadcast_all(&OutboundFrame::ping()), 1);
        let frame = fast_rx.try_recv().unwrap();
        assert!(frame.contains("\"ping\""));
        assert_eq!(hub.connection_count(), 1);
        assert_eq!(hub.metrics_snapshot().connections_overflowed, 1);
    }

    #[test]
    fn test_broadcast_full_buffer_does_not_abort_fan_out() {
        let hub = hub_with_buffer(1);
        let (_a, _a_rx) = hub.register(Recipient::Admin(1)).unwrap();
        let (_b, mut b_rx) = hub.register(Recipient::Admin(2)).unwrap();
        let (_u, _u_rx) = hub.register(Recipient::User(1)).unwrap();

        assert!(hub.send_to(&Recipient::Admin(1), &OutboundFrame::ping()).is_sent());
        assert_eq!(hub.broadcast_admins(&OutboundFrame::pong()), 1);
        assert!(b_rx.try_recv().is_ok());
        assert!(!hub.is_connected(&Recipient::Admin(1)));
        assert!(hub.is_connected(&Recipient::User(1)));
    }

    #[test]
    fn test_reregistration_replaces_previous_connection() {
        let hub = hub_with_buffer(4);
        let (first, _first_rx) = hub.register(Recipient::User(1)).unwrap();
        let (second, mut second_rx) = hub.register(Recipient::User(1)).unwrap();

        assert!(first.cancellation().is_cancelled());
        assert_eq!(hub.connection_count(), 1);
        assert!(!hub.unregister(&first.id));

        assert!(hub.send_to(&Recipient::User(1), &OutboundFrame::ping()).is_sent());
        assert!(second_rx.try_recv().is_ok());
        assert!(hub.unregister(&second.id));
        assert!(!hub.is_connected(&Recipient::User(1)));
    }

    #[test]
    fn test_evict_stale() {
        let hub = hub_with_buffer(4);
        let (stale, _rx1) = hub.register(Recipient::User(1)).unwrap();
        let (fresh, _rx2) = hub.register(Recipient::User(2)).unwrap();

        let later = stale.last_heartbeat() + chrono::Duration::seconds(121);
        fresh.record_heartbeat_at(later);

        assert_eq!(hub.evict_stale(later), 1);
        assert!(!hub.is_connected(&Recipient::User(1)));
        assert!(hub.is_connected(&Recipient::User(2)));
        assert!(stale.cancellation().is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_closes_and_refuses() {
        let hub = Arc::new(hub_with_buffer(4));
        hub.start();
        let (handle, _rx) = hub.register(Recipient::User(1)).unwrap();

        hub.shutdown().await;

        assert!(handle.cancellation().is_cancelled());
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(
            hub.send_to(&Recipient::User(1), &OutboundFrame::ping()),
            SendOutcome::Offline
        );
        assert_eq!(hub.broadcast_all(&OutboundFrame::ping()), 0);
        assert!(hub.register(Recipient::User(1)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_loop_reaches_connections() {
        let hub = Arc::new(hub_with_buffer(4));
        let (_handle, mut rx) = hub.register(Recipient::Admin(3)).unwrap();
        hub.start();

        let frame = tokio::time::timeout(Duration::from_secs(45), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "ping");

        hub.shutdown().await;
    }
}
