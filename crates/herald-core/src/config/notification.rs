//! Inbox retention configuration.

use serde::{Deserialize, Serialize};

/// Per-recipient inbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Days until a new notification expires.
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: i64,
    /// Maximum live notifications kept per recipient.
    #[serde(default = "default_max_per_recipient")]
    pub max_per_recipient: u64,
    /// Capacity of the retention work queue.
    #[serde(default = "default_retention_queue_size")]
    pub retention_queue_size: usize,
    /// Cron expression for the expiry and cap sweep.
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_ttl_days(),
            max_per_recipient: default_max_per_recipient(),
            retention_queue_size: default_retention_queue_size(),
            sweep_schedule: default_sweep_schedule(),
        }
    }
}

fn default_ttl_days() -> i64 {
    30
}

fn default_max_per_recipient() -> u64 {
    100
}

fn default_retention_queue_size() -> usize {
    1024
}

fn default_sweep_schedule() -> String {
    "0 */15 * * * *".to_string()
}
