//! Integration tests for the WebSocket upgrade and health endpoints.

mod helpers;

use http::StatusCode;

use herald_core::Recipient;

#[tokio::test]
async fn test_ws_upgrade_without_identity() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/ws", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = helpers::TestApp::new();
    let (_handle, _rx) = app.state.hub.register(Recipient::Admin(1)).unwrap();

    let response = app.request("GET", "/api/health/detailed", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = response.data();
    assert_eq!(data["status"], "ok");
    assert_eq!(data["store"]["provider"], "memory");
    assert_eq!(data["hub"]["connections"], 1);
    assert_eq!(data["hub"]["metrics"]["connections_opened"], 1);
    assert_eq!(data["delivery"]["healthy"], true);
    assert_eq!(data["channels"], serde_json::json!([]));
}
