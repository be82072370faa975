//! Producer entry point over HTTP.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use herald_entity::notification::Notification;

use crate::dto::request::NotifyBody;
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// POST /api/notify
pub async fn notify(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NotifyBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Notification>>)> {
    let notification = state.notifier.notify(body.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(notification))))
}
