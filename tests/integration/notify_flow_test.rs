//! End-to-end tests of `POST /api/notify`: inbox, live push, and email
//! fallback through the delivery runner.

mod helpers;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::StatusCode;
use serde_json::{Value, json};

use herald_core::Recipient;
use herald_core::config::AppConfig;
use herald_delivery::{ChannelRegistry, ChannelSender, DeliveryRunner, SendError};
use herald_entity::delivery::DeliveryChannel;

/// Email sender that records every message it is asked to send.
#[derive(Debug, Default)]
struct RecordingEmail {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ChannelSender for RecordingEmail {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Email
    }

    async fn send(
        &self,
        address: Option<&str>,
        subject: &str,
        _body: &str,
    ) -> Result<(), SendError> {
        let address = address.ok_or(SendError::MissingAddress)?;
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), subject.to_string()));
        Ok(())
    }
}

fn saved_event(recipient: Value) -> Value {
    json!({
        "recipient": recipient,
        "kind": "success",
        "display_mode": "toast",
        "title": "Saved",
        "body": "Your changes were saved"
    })
}

#[tokio::test]
async fn test_notify_online_user_gets_live_frame_and_inbox_entry() {
    let app = helpers::TestApp::new();
    let (_handle, mut rx) = app.state.hub.register(Recipient::User(1)).unwrap();

    let response = app
        .request(
            "POST",
            "/api/notify",
            Some(saved_event(json!({"type": "user", "id": 1}))),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    let id = response.data()["id"].as_str().unwrap().to_string();

    let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
    assert_eq!(frame["type"], "notification");
    assert_eq!(frame["data"]["id"], id.as_str());
    assert_eq!(frame["data"]["title"], "Saved");
    assert_eq!(frame["data"]["duration_secs"], 5);

    let inbox = app
        .request("GET", "/api/notifications", None, Some(Recipient::User(1)))
        .await;
    assert_eq!(inbox.status, StatusCode::OK);
    assert_eq!(inbox.data()["total"], 1);
    assert_eq!(inbox.data()["items"][0]["read"], false);

    let metrics = app.request("GET", "/api/delivery/metrics", None, None).await;
    assert_eq!(metrics.data()["by_channel"]["live"], 1);
    assert_eq!(metrics.data()["by_state"]["delivered"], 1);
    assert_eq!(metrics.data()["live_undelivered"], 0);
}

#[tokio::test]
async fn test_notify_offline_user_parks_live_row() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/notify",
            Some(saved_event(json!({"type": "user", "id": 2}))),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let count = app
        .request(
            "GET",
            "/api/notifications/unread-count",
            None,
            Some(Recipient::User(2)),
        )
        .await;
    assert_eq!(count.data()["count"], 1);

    let metrics = app.request("GET", "/api/delivery/metrics", None, None).await;
    assert_eq!(metrics.data()["live_undelivered"], 1);
    assert_eq!(metrics.data()["queue_depth"], 0);
}

#[tokio::test]
async fn test_notify_offline_user_falls_back_to_email() {
    let email = Arc::new(RecordingEmail::default());
    let mut channels = ChannelRegistry::new();
    channels.register(email.clone());
    let app = helpers::TestApp::with_channels(AppConfig::default(), channels);

    let prefs = app
        .request(
            "PUT",
            "/api/preferences",
            Some(json!({"email_address": "ops@example.com"})),
            Some(Recipient::Admin(4)),
        )
        .await;
    assert_eq!(prefs.status, StatusCode::OK, "{:?}", prefs.body);

    let response = app
        .request(
            "POST",
            "/api/notify",
            Some(saved_event(json!({"type": "admin", "id": 4}))),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let runner = DeliveryRunner::new(
        Arc::clone(&app.state.queue),
        Arc::clone(&app.state.channels),
    );
    assert_eq!(runner.drain_once().await.unwrap(), 1);

    let sent = email.sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![("ops@example.com".to_string(), "Saved".to_string())]
    );
}

#[tokio::test]
async fn test_notify_rejects_blank_title() {
    let app = helpers::TestApp::new();
    let mut event = saved_event(json!({"type": "user", "id": 1}));
    event["title"] = json!("");

    let response = app.request("POST", "/api/notify", Some(event), None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}
