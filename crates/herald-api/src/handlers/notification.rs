//! Inbox handlers. Every operation is scoped to the caller's recipient.

use axum::Json;
use axum::extract::{Path, Query, State};

use herald_core::types::{NotificationId, PageResponse};
use herald_entity::notification::{Notification, NotificationStats};

use crate::dto::response::{ApiResponse, CountResponse, MarkedResponse, MessageResponse};
use crate::error::ApiResult;
use crate::extractors::{CallerRecipient, PaginationParams};
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: CallerRecipient,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PageResponse<Notification>>>> {
    let page = state
        .notifications
        .list(caller.0, params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/notifications/unread
pub async fn list_unread(
    State(state): State<AppState>,
    caller: CallerRecipient,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PageResponse<Notification>>>> {
    let page = state
        .notifications
        .list_unread(caller.0, params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    caller: CallerRecipient,
) -> ApiResult<Json<ApiResponse<CountResponse>>> {
    let count = state.notifications.unread_count(caller.0).await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// GET /api/notifications/stats
pub async fn statistics(
    State(state): State<AppState>,
    caller: CallerRecipient,
) -> ApiResult<Json<ApiResponse<NotificationStats>>> {
    let stats = state.notifications.statistics(caller.0).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/notifications/{id}
pub async fn get_notification(
    State(state): State<AppState>,
    caller: CallerRecipient,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let notification = state.notifications.get(id, caller.0).await?;
    Ok(Json(ApiResponse::ok(notification)))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    caller: CallerRecipient,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.notifications.mark_read(id, caller.0).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Marked as read"))))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    caller: CallerRecipient,
) -> ApiResult<Json<ApiResponse<MarkedResponse>>> {
    let marked = state.notifications.mark_all_read(caller.0).await?;
    Ok(Json(ApiResponse::ok(MarkedResponse { marked })))
}

/// PUT /api/notifications/{id}/dismiss
pub async fn dismiss(
    State(state): State<AppState>,
    caller: CallerRecipient,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.notifications.dismiss(id, caller.0).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Dismissed"))))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    caller: CallerRecipient,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.notifications.delete(id, caller.0).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Deleted"))))
}
