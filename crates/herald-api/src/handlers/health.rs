//! Health check handlers.

use axum::Json;
use axum::extract::State;

use herald_core::AppError;

use crate::dto::response::{
    ApiResponse, DetailedHealthResponse, HealthResponse, HubHealth, StoreHealth,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<DetailedHealthResponse>>> {
    let store_healthy = match state.stores.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    let delivery = state.delivery_metrics.health().await.map_err(|e| {
        AppError::service_unavailable(format!("Delivery health unavailable: {}", e.message))
    })?;

    let hub = HubHealth {
        running: state.hub.is_running(),
        connections: state.hub.connection_count(),
        metrics: state.hub.metrics_snapshot(),
    };

    let status = if store_healthy && hub.running && delivery.healthy {
        "ok"
    } else {
        "degraded"
    };

    Ok(Json(ApiResponse::ok(DetailedHealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        store: StoreHealth {
            provider: state.stores.provider_name().to_string(),
            healthy: store_healthy,
        },
        hub,
        channels: state.channels.channels(),
        delivery,
    })))
}
