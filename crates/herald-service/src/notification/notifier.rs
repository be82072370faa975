//! The single entry point producers call to notify a recipient.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use herald_core::{AppError, AppResult, Recipient};
use herald_delivery::{DeliveryQueue, EnqueueRequest};
use herald_entity::delivery::{DeliveryChannel, DeliveryPriority};
use herald_entity::notification::{
    DisplayMode, NewNotification, Notification, NotificationAction, NotificationKind, Severity,
};
use herald_realtime::message::types::NotificationPayload;
use herald_realtime::{Hub, OutboundFrame};

use crate::gate::{GateInput, PreferenceGate};
use crate::notification::service::NotificationService;
use crate::preference::PreferenceService;

/// A producer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    /// Who receives it.
    pub recipient: Recipient,
    /// Kind.
    pub kind: NotificationKind,
    /// Rendering hint.
    pub display_mode: DisplayMode,
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
    /// Optional call-to-action.
    #[serde(default)]
    pub action: Option<NotificationAction>,
}

/// Routes an event to the inbox, the live connection, and email according
/// to the recipient's preferences.
#[derive(Debug, Clone)]
pub struct Notifier {
    notifications: Arc<NotificationService>,
    preferences: Arc<PreferenceService>,
    hub: Arc<Hub>,
    queue: Arc<DeliveryQueue>,
    gate: PreferenceGate,
    email_configured: bool,
}

impl Notifier {
    /// Create the notifier. `email_configured` reflects whether an email
    /// sender is registered.
    pub fn new(
        notifications: Arc<NotificationService>,
        preferences: Arc<PreferenceService>,
        hub: Arc<Hub>,
        queue: Arc<DeliveryQueue>,
        email_configured: bool,
    ) -> Self {
        Self {
            notifications,
            preferences,
            hub,
            queue,
            gate: PreferenceGate::new(),
            email_configured,
        }
    }

    /// Persist the inbox entry, then push live and queue email as the gate
    /// decides. Failures on the live or email path are logged and do not
    /// fail the call.
    pub async fn notify(&self, request: NotifyRequest) -> AppResult<Notification> {
        if request.title.trim().is_empty() {
            return Err(AppError::validation("Notification title must not be empty"));
        }
        if request.body.trim().is_empty() {
            return Err(AppError::validation("Notification body must not be empty"));
        }

        let recipient = request.recipient;
        let severity = request.kind.severity();
        let preference = self.preferences.get(recipient).await?;

        let notification = self
            .notifications
            .create(NewNotification {
                recipient,
                kind: request.kind,
                display_mode: request.display_mode,
                title: request.title,
                body: request.body,
                action: request.action,
                expires_at: None,
            })
            .await?;

        let plan = self.gate.evaluate(GateInput {
            preference: &preference,
            severity,
            display_mode: notification.display_mode,
            online: self.hub.is_connected(&recipient),
            email_configured: self.email_configured,
        });
        let priority = priority_for(severity);

        if plan.live {
            let frame = OutboundFrame::Notification(NotificationPayload {
                notification: notification.clone(),
                duration_secs: preference.duration_for(notification.kind),
            });
            let delivered = self.hub.send_to(&recipient, &frame).is_sent();

            let record = EnqueueRequest::new(
                Some(recipient),
                DeliveryChannel::Live,
                notification.title.clone(),
                notification.body.clone(),
            )
            .with_priority(priority);
            if let Err(e) = self.queue.record_live(record, delivered).await {
                warn!(recipient = %recipient, error = %e, "Failed to record live delivery");
            }
        }

        if plan.email {
            if let Some(address) = preference.usable_email() {
                let request = EnqueueRequest::new(
                    Some(recipient),
                    DeliveryChannel::Email,
                    notification.title.clone(),
                    notification.body.clone(),
                )
                .with_priority(priority)
                .with_address(address);
                if let Err(e) = self.queue.enqueue(request).await {
                    warn!(recipient = %recipient, error = %e, "Failed to queue email delivery");
                }
            }
        }

        debug!(
            notification_id = %notification.id,
            recipient = %recipient,
            live = plan.live,
            email = plan.email,
            "Notification dispatched"
        );

        Ok(notification)
    }
}

/// Queue priority for a notification severity.
fn priority_for(severity: Severity) -> DeliveryPriority {
    match severity {
        Severity::Critical => DeliveryPriority::Critical,
        Severity::Error => DeliveryPriority::High,
        Severity::Warning | Severity::Success | Severity::Info => DeliveryPriority::Normal,
    }
}

#[cfg(test)]
mod tests {
    use herald_core::config::{DeliveryConfig, NotificationConfig, RealtimeConfig};
    use herald_core::types::PageRequest;
    use herald_database::{DeliveryStore, NotificationStore, StoreManager};
    use herald_entity::delivery::DeliveryState;

    use super::*;
    use crate::preference::PreferenceUpdate;
    use crate::retention::{RetentionQueue, RetentionWorker};

    struct Fixture {
        notifier: Notifier,
        hub: Arc<Hub>,
        stores: StoreManager,
        preferences: Arc<PreferenceService>,
        retention_rx: tokio::sync::mpsc::Receiver<Recipient>,
    }

    fn fixture(email_configured: bool) -> Fixture {
        let stores = StoreManager::memory();
        let hub = Arc::new(Hub::new(RealtimeConfig::default()));
        let (retention, retention_rx) = RetentionQueue::channel(64);
        let notifications = Arc::new(NotificationService::new(
            stores.notifications(),
            retention,
            NotificationConfig::default(),
        ));
        let preferences = Arc::new(PreferenceService::new(stores.preferences()));
        let queue = Arc::new(DeliveryQueue::new(
            stores.deliveries(),
            Arc::clone(&hub),
            DeliveryConfig::default(),
        ));
        let notifier = Notifier::new(
            notifications,
            Arc::clone(&preferences),
            Arc::clone(&hub),
            queue,
            email_configured,
        );
        Fixture {
            notifier,
            hub,
            stores,
            preferences,
            retention_rx,
        }
    }

    fn request(kind: NotificationKind) -> NotifyRequest {
        NotifyRequest {
            recipient: Recipient::User(1),
            kind,
            display_mode: DisplayMode::Toast,
            title: "Saved".to_string(),
            body: "Your changes were saved".to_string(),
            action: None,
        }
    }

    async fn rows_in(fx: &Fixture, state: DeliveryState) -> Vec<herald_entity::delivery::DeliveryItem> {
        fx.stores
            .deliveries()
            .list_by_state(state, PageRequest::default())
            .await
            .unwrap()
            .items
    }

    #[tokio::test]
    async fn test_online_success_pushes_live_with_duration() {
        let fx = fixture(false);
        let (_handle, mut rx) = fx.hub.register(Recipient::User(1)).unwrap();

        let notification = fx.notifier.notify(request(NotificationKind::Success)).await.unwrap();

        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["type"], "notification");
        assert_eq!(frame["data"]["id"], notification.id.to_string());
        assert_eq!(frame["data"]["duration_secs"], 5);

        let delivered = rows_in(&fx, DeliveryState::Delivered).await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].channel, DeliveryChannel::Live);
    }

    #[tokio::test]
    async fn test_offline_with_address_queues_email() {
        let fx = fixture(true);
        fx.preferences
            .update(
                Recipient::User(1),
                PreferenceUpdate {
                    email_address: Some("ada@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        fx.notifier.notify(request(NotificationKind::Info)).await.unwrap();

        let queued = rows_in(&fx, DeliveryState::Queued).await;
        let email = queued
            .iter()
            .find(|i| i.channel == DeliveryChannel::Email)
            .unwrap();
        assert_eq!(email.address.as_deref(), Some("ada@example.com"));
        // The offline live attempt is recorded but parked.
        assert!(queued.iter().any(|i| i.channel == DeliveryChannel::Live));
    }

    #[tokio::test]
    async fn test_disabled_toast_still_writes_inbox() {
        let fx = fixture(false);
        let (_handle, mut rx) = fx.hub.register(Recipient::User(1)).unwrap();
        fx.preferences
            .update(
                Recipient::User(1),
                PreferenceUpdate {
                    toast_enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let notification = fx.notifier.notify(request(NotificationKind::Warning)).await.unwrap();

        assert!(rx.try_recv().is_err());
        assert!(rows_in(&fx, DeliveryState::Delivered).await.is_empty());
        let inbox = fx
            .stores
            .notifications()
            .get_by_id(notification.id, Recipient::User(1), chrono::Utc::now())
            .await
            .unwrap();
        assert_eq!(inbox.title, "Saved");
    }

    #[tokio::test]
    async fn test_rejects_empty_title() {
        let fx = fixture(false);
        let mut bad = request(NotificationKind::Info);
        bad.title = "  ".to_string();
        assert!(fx.notifier.notify(bad).await.is_err());
    }

    #[tokio::test]
    async fn test_retention_keeps_newest_notifications() {
        let fx = fixture(false);
        for i in 0..5 {
            let mut req = request(NotificationKind::Info);
            req.title = format!("event {i}");
            fx.notifier.notify(req).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let mut worker = RetentionWorker::new(fx.retention_rx, fx.stores.notifications(), 3);
        assert_eq!(worker.drain_pending().await, 2);

        let remaining = fx
            .stores
            .notifications()
            .list_by_recipient(Recipient::User(1), PageRequest::default(), chrono::Utc::now())
            .await
            .unwrap()
            .items;
        let titles: Vec<&str> = remaining.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["event 4", "event 3", "event 2"]);
    }
}
