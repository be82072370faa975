//! Delivery queue, drain runner, and health threshold configuration.

use serde::{Deserialize, Serialize};

/// Delivery queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Whether the drain runner is started.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Failed attempts allowed before an item is dead-lettered.
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    /// Base delay of the exponential retry backoff.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_seconds: u64,
    /// Upper bound of the retry backoff.
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_seconds: u64,
    /// Timeout applied to each channel send.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    /// Number of items sent concurrently by the drain runner.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Maximum items claimed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Interval between queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// `sending` rows untouched for this long are treated as abandoned.
    #[serde(default = "default_stale_sending")]
    pub stale_sending_seconds: u64,
    /// Delivered rows older than this are purged.
    #[serde(default = "default_delivered_retention")]
    pub delivered_retention_days: i64,
    /// Health check thresholds.
    #[serde(default)]
    pub health: HealthThresholds,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            retry_base_delay_seconds: default_retry_base_delay(),
            retry_max_delay_seconds: default_retry_max_delay(),
            send_timeout_seconds: default_send_timeout(),
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            poll_interval_seconds: default_poll_interval(),
            stale_sending_seconds: default_stale_sending(),
            delivered_retention_days: default_delivered_retention(),
            health: HealthThresholds::default(),
        }
    }
}

/// Thresholds applied by the delivery health check. Each one is independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Queue depth (`queued + sending`) above which the queue is unhealthy.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: u64,
    /// A queued item older than this counts as stuck.
    #[serde(default = "default_stuck_after")]
    pub stuck_after_seconds: u64,
    /// Error rate (0.0 - 1.0) above which the queue is unhealthy.
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate: f64,
    /// Window over which the error rate is computed.
    #[serde(default = "default_error_window")]
    pub error_window_seconds: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_queue_depth: default_max_queue_depth(),
            stuck_after_seconds: default_stuck_after(),
            max_error_rate: default_max_error_rate(),
            error_window_seconds: default_error_window(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> i32 {
    5
}

fn default_retry_base_delay() -> u64 {
    30
}

fn default_retry_max_delay() -> u64 {
    3600
}

fn default_send_timeout() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

fn default_batch_size() -> usize {
    50
}

fn default_poll_interval() -> u64 {
    5
}

fn default_stale_sending() -> u64 {
    600
}

fn default_delivered_retention() -> i64 {
    30
}

fn default_max_queue_depth() -> u64 {
    1000
}

fn default_stuck_after() -> u64 {
    3600
}

fn default_max_error_rate() -> f64 {
    0.1
}

fn default_error_window() -> u64 {
    3600
}
