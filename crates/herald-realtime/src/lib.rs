//! # herald-realtime
//!
//! In-process connection hub for Herald. Provides:
//!
//! - A registry of live connections, at most one per recipient
//! - Non-blocking fan-out with disconnect-on-overflow backpressure
//! - Heartbeat pings and stale-connection eviction
//! - Typed wire frames and connection counters

pub mod connection;
pub mod hub;
pub mod message;
pub mod metrics;

pub use connection::{ConnectionHandle, ConnectionId};
pub use hub::{Hub, SendOutcome};
pub use message::types::{InboundFrame, OutboundFrame};
pub use metrics::RealtimeMetrics;
