//! Connection hub configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound frame buffer.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Interval between `ping` frames sent to every connection.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Interval between stale-connection sweeps.
    #[serde(default = "default_stale_sweep_interval")]
    pub stale_sweep_interval_seconds: u64,
    /// A connection with no heartbeat for this long is evicted.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_seconds: u64,
}

impl RealtimeConfig {
    /// Idle read timeout for a connection's read pump (twice the ping interval).
    pub fn read_idle_timeout_seconds(&self) -> u64 {
        self.ping_interval_seconds.saturating_mul(2)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            ping_interval_seconds: default_ping_interval(),
            stale_sweep_interval_seconds: default_stale_sweep_interval(),
            heartbeat_timeout_seconds: default_heartbeat_timeout(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_stale_sweep_interval() -> u64 {
    300
}

fn default_heartbeat_timeout() -> u64 {
    120
}
