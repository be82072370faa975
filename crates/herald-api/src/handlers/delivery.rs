//! Delivery queue handlers: enqueue, inspection, dead-letter replay, and
//! metrics.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use herald_core::types::{DeliveryId, PageResponse};
use herald_delivery::{DeliveryHealth, DeliveryMetrics};
use herald_entity::delivery::DeliveryItem;

use crate::dto::request::EnqueueBody;
use crate::dto::response::{ApiResponse, EnqueueResponse};
use crate::error::ApiResult;
use crate::extractors::{PaginationParams, ValidatedJson};
use crate::state::AppState;

/// POST /api/delivery
pub async fn enqueue(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<EnqueueBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<EnqueueResponse>>)> {
    let id = state.queue.enqueue(body.into()).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok(EnqueueResponse { id })),
    ))
}

/// GET /api/delivery/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
) -> ApiResult<Json<ApiResponse<DeliveryItem>>> {
    let item = state.queue.get(id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// GET /api/delivery/dead-letters
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PageResponse<DeliveryItem>>>> {
    let page = state
        .queue
        .list_dead_letters(params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /api/delivery/{id}/replay
pub async fn replay(
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
) -> ApiResult<(StatusCode, Json<ApiResponse<DeliveryItem>>)> {
    let item = state.queue.replay(id).await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::ok(item))))
}

/// GET /api/delivery/metrics
pub async fn metrics(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<DeliveryMetrics>>> {
    let metrics = state.delivery_metrics.collect().await?;
    Ok(Json(ApiResponse::ok(metrics)))
}

/// GET /api/delivery/health
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<DeliveryHealth>>> {
    let health = state.delivery_metrics.health().await?;
    Ok(Json(ApiResponse::ok(health)))
}
