//! Response DTOs.

use serde::{Deserialize, Serialize};

use herald_core::types::DeliveryId;
use herald_delivery::DeliveryHealth;
use herald_entity::delivery::DeliveryChannel;
use herald_realtime::metrics::RealtimeMetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// A bare count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Number of rows changed by a bulk operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkedResponse {
    pub marked: u64,
}

/// Acknowledgement message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Id of a freshly enqueued delivery item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub id: DeliveryId,
}

/// Basic liveness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
}

/// Persistence backend status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHealth {
    /// `postgres` or `memory`.
    pub provider: String,
    pub healthy: bool,
}

/// Connection hub status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubHealth {
    pub running: bool,
    pub connections: usize,
    pub metrics: RealtimeMetricsSnapshot,
}

/// Component-level health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// `ok` when every component is healthy, `degraded` otherwise.
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
    pub store: StoreHealth,
    pub hub: HubHealth,
    /// Out-of-band channels with a registered sender.
    pub channels: Vec<DeliveryChannel>,
    pub delivery: DeliveryHealth,
}
