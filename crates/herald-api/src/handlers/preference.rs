//! Delivery preference handlers.

use axum::Json;
use axum::extract::State;

use herald_entity::preference::DeliveryPreference;

use crate::dto::request::UpdatePreferencesBody;
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::{CallerRecipient, ValidatedJson};
use crate::state::AppState;

/// GET /api/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    caller: CallerRecipient,
) -> ApiResult<Json<ApiResponse<DeliveryPreference>>> {
    let prefs = state.preferences.get(caller.0).await?;
    Ok(Json(ApiResponse::ok(prefs)))
}

/// PUT /api/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    caller: CallerRecipient,
    ValidatedJson(body): ValidatedJson<UpdatePreferencesBody>,
) -> ApiResult<Json<ApiResponse<DeliveryPreference>>> {
    let prefs = state.preferences.update(caller.0, body.into()).await?;
    Ok(Json(ApiResponse::ok(prefs)))
}
