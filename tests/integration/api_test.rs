//! Integration tests for the inbox, preference, and delivery endpoints.

mod helpers;

use http::StatusCode;
use serde_json::json;

use herald_core::Recipient;

const ALICE: Recipient = Recipient::User(1);
const BOB: Recipient = Recipient::User(2);

async fn notify(app: &helpers::TestApp, recipient: Recipient, title: &str) -> String {
    let response = app
        .request(
            "POST",
            "/api/notify",
            Some(json!({
                "recipient": recipient,
                "kind": "info",
                "display_mode": "center",
                "title": title,
                "body": "body"
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.data()["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_inbox_requires_identity() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/notifications", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_read_dismiss_and_delete() {
    let app = helpers::TestApp::new();
    let first = notify(&app, ALICE, "first").await;
    let second = notify(&app, ALICE, "second").await;

    let listing = app
        .request("GET", "/api/notifications", None, Some(ALICE))
        .await;
    assert_eq!(listing.data()["total"], 2);

    let read = app
        .request(
            "PUT",
            &format!("/api/notifications/{first}/read"),
            None,
            Some(ALICE),
        )
        .await;
    assert_eq!(read.status, StatusCode::OK);

    let unread = app
        .request("GET", "/api/notifications/unread", None, Some(ALICE))
        .await;
    assert_eq!(unread.data()["total"], 1);
    assert_eq!(unread.data()["items"][0]["id"], second.as_str());

    let dismissed = app
        .request(
            "PUT",
            &format!("/api/notifications/{second}/dismiss"),
            None,
            Some(ALICE),
        )
        .await;
    assert_eq!(dismissed.status, StatusCode::OK);

    let stats = app
        .request("GET", "/api/notifications/stats", None, Some(ALICE))
        .await;
    assert_eq!(stats.data()["dismissed"], 1);

    let deleted = app
        .request(
            "DELETE",
            &format!("/api/notifications/{first}"),
            None,
            Some(ALICE),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app
        .request(
            "GET",
            &format!("/api/notifications/{first}"),
            None,
            Some(ALICE),
        )
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_foreign_notification_is_not_found() {
    let app = helpers::TestApp::new();
    let id = notify(&app, ALICE, "private").await;

    let response = app
        .request("GET", &format!("/api/notifications/{id}"), None, Some(BOB))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(
            "PUT",
            &format!("/api/notifications/{id}/read"),
            None,
            Some(BOB),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_all_read_counts_changes() {
    let app = helpers::TestApp::new();
    notify(&app, ALICE, "a").await;
    notify(&app, ALICE, "b").await;
    notify(&app, BOB, "c").await;

    let response = app
        .request("PUT", "/api/notifications/read-all", None, Some(ALICE))
        .await;
    assert_eq!(response.data()["marked"], 2);

    let count = app
        .request("GET", "/api/notifications/unread-count", None, Some(BOB))
        .await;
    assert_eq!(count.data()["count"], 1);
}

#[tokio::test]
async fn test_preferences_defaults_and_update() {
    let app = helpers::TestApp::new();

    let defaults = app
        .request("GET", "/api/preferences", None, Some(ALICE))
        .await;
    assert_eq!(defaults.status, StatusCode::OK);
    assert_eq!(defaults.data()["live_enabled"], true);
    assert_eq!(defaults.data()["email_address"], serde_json::Value::Null);

    let updated = app
        .request(
            "PUT",
            "/api/preferences",
            Some(json!({"toast_enabled": false, "warning_duration_secs": 20})),
            Some(ALICE),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["toast_enabled"], false);
    assert_eq!(updated.data()["warning_duration_secs"], 20);
    assert_eq!(updated.data()["banner_enabled"], true);

    let invalid = app
        .request(
            "PUT",
            "/api/preferences",
            Some(json!({"error_duration_secs": -5})),
            Some(ALICE),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enqueue_and_inspect_delivery() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/delivery",
            Some(json!({
                "channel": "webhook",
                "subject": "Build {{status}}",
                "body": "Pipeline {{name}} {{status}}",
                "vars": {"status": "failed", "name": "nightly"},
                "priority": "high"
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED, "{:?}", response.body);
    let id = response.data()["id"].as_str().unwrap().to_string();

    let item = app
        .request("GET", &format!("/api/delivery/{id}"), None, None)
        .await;
    assert_eq!(item.status, StatusCode::OK);
    assert_eq!(item.data()["state"], "queued");
    assert_eq!(item.data()["subject"], "Build failed");
    assert_eq!(item.data()["body"], "Pipeline nightly failed");

    let replay = app
        .request("POST", &format!("/api/delivery/{id}/replay"), None, None)
        .await;
    assert_eq!(replay.status, StatusCode::CONFLICT);

    let metrics = app.request("GET", "/api/delivery/metrics", None, None).await;
    assert_eq!(metrics.data()["queue_depth"], 1);
    assert_eq!(metrics.data()["by_priority"]["high"], 1);
}

#[tokio::test]
async fn test_email_enqueue_without_recipient_rejected() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/delivery",
            Some(json!({"channel": "email", "subject": "Hi", "body": "there"})),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_delivery_and_empty_dead_letters() {
    let app = helpers::TestApp::new();

    let missing = app
        .request(
            "GET",
            "/api/delivery/0190b6a4-0000-7000-8000-000000000000",
            None,
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let dead = app
        .request("GET", "/api/delivery/dead-letters?limit=10", None, None)
        .await;
    assert_eq!(dead.status, StatusCode::OK);
    assert_eq!(dead.data()["total"], 0);

    let health = app.request("GET", "/api/delivery/health", None, None).await;
    assert_eq!(health.data()["healthy"], true);
}
