//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use herald_api::AppState;
use herald_core::Recipient;
use herald_core::config::AppConfig;
use herald_database::StoreManager;
use herald_delivery::ChannelRegistry;
use herald_realtime::Hub;
use herald_service::RetentionQueue;

/// Test application context backed by the in-memory stores
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for reaching the hub and services directly
    pub state: AppState,
    /// Receiving side of the retention queue
    pub retention_rx: mpsc::Receiver<Recipient>,
}

impl TestApp {
    /// Create a new test application with default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application with `config` and no channel senders
    pub fn with_config(config: AppConfig) -> Self {
        Self::with_channels(config, ChannelRegistry::new())
    }

    /// Create a test application with `config` and `channels`
    pub fn with_channels(mut config: AppConfig, channels: ChannelRegistry) -> Self {
        config.database.provider = "memory".to_string();

        let stores = Arc::new(StoreManager::memory());
        let hub = Arc::new(Hub::new(config.realtime.clone()));
        let channels = Arc::new(channels);
        let (retention, retention_rx) =
            RetentionQueue::channel(config.notifications.retention_queue_size);

        let state = AppState::new(Arc::new(config), stores, hub, channels, retention);
        let router = herald_api::build_router(state.clone());

        Self {
            router,
            state,
            retention_rx,
        }
    }

    /// Make an HTTP request to the test app, optionally as `recipient`
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        recipient: Option<Recipient>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(recipient) = recipient {
            req = req
                .header("x-recipient-type", recipient.recipient_type().as_str())
                .header("x-recipient-id", recipient.id().to_string());
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}
