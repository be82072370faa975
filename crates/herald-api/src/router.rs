//! Route definitions for the Herald HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket upgrade lives at
//! `/ws`.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(preference_routes())
        .merge(delivery_routes())
        .merge(health_routes());

    let cors = build_cors_layer(&state.config.server.cors);
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .nest("/api", api_routes.layer(TimeoutLayer::new(timeout)))
        .route("/ws", get(handlers::ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Inbox endpoints
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/unread",
            get(handlers::notification::list_unread),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/stats",
            get(handlers::notification::statistics),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/{id}",
            get(handlers::notification::get_notification)
                .delete(handlers::notification::delete_notification),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notification::mark_read),
        )
        .route(
            "/notifications/{id}/dismiss",
            put(handlers::notification::dismiss),
        )
}

/// Delivery preference endpoints
fn preference_routes() -> Router<AppState> {
    Router::new().route(
        "/preferences",
        get(handlers::preference::get_preferences).put(handlers::preference::update_preferences),
    )
}

/// Producer and delivery queue endpoints
fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/notify", post(handlers::notify::notify))
        .route("/delivery", post(handlers::delivery::enqueue))
        .route(
            "/delivery/dead-letters",
            get(handlers::delivery::list_dead_letters),
        )
        .route("/delivery/metrics", get(handlers::delivery::metrics))
        .route("/delivery/health", get(handlers::delivery::health))
        .route("/delivery/{id}", get(handlers::delivery::get_item))
        .route("/delivery/{id}/replay", post(handlers::delivery::replay))
}

/// Health endpoints
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
