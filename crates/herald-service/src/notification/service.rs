//! Inbox operations for a single recipient.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use herald_core::config::NotificationConfig;
use herald_core::types::{NotificationId, PageRequest, PageResponse};
use herald_core::{AppResult, Recipient};
use herald_database::NotificationStore;
use herald_entity::notification::{NewNotification, Notification, NotificationStats};

use crate::retention::RetentionQueue;

/// Façade over the [`NotificationStore`] that stamps times, applies the
/// configured TTL, and schedules cap enforcement.
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    retention: RetentionQueue,
    config: NotificationConfig,
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        retention: RetentionQueue,
        config: NotificationConfig,
    ) -> Self {
        Self {
            store,
            retention,
            config,
        }
    }

    /// Persist a new notification and queue its recipient for trimming.
    pub async fn create(&self, new: NewNotification) -> AppResult<Notification> {
        let notification = new.into_notification(Utc::now(), self.config.default_ttl_days);
        self.store.create(&notification).await?;
        self.retention.push(notification.recipient);

        debug!(
            notification_id = %notification.id,
            recipient = %notification.recipient,
            kind = notification.kind.as_str(),
            "Notification created"
        );
        Ok(notification)
    }

    /// One notification owned by `recipient`.
    pub async fn get(&self, id: NotificationId, recipient: Recipient) -> AppResult<Notification> {
        self.store.get_by_id(id, recipient, Utc::now()).await
    }

    /// Lists notifications for the recipient, newest first.
    pub async fn list(
        &self,
        recipient: Recipient,
        page: PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        self.store.list_by_recipient(recipient, page, Utc::now()).await
    }

    /// Unread notifications, newest first.
    pub async fn list_unread(
        &self,
        recipient: Recipient,
        page: PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        self.store.list_unread(recipient, page, Utc::now()).await
    }

    /// Gets the unread notification count.
    pub async fn unread_count(&self, recipient: Recipient) -> AppResult<u64> {
        self.store.unread_count(recipient, Utc::now()).await
    }

    /// Marks a notification as read.
    pub async fn mark_read(&self, id: NotificationId, recipient: Recipient) -> AppResult<()> {
        self.store.mark_read(id, recipient, Utc::now()).await
    }

    /// Marks all notifications as read.
    pub async fn mark_all_read(&self, recipient: Recipient) -> AppResult<u64> {
        let count = self.store.mark_all_read(recipient, Utc::now()).await?;
        info!(recipient = %recipient, count, "Marked all notifications read");
        Ok(count)
    }

    /// Hide a notification from listings.
    pub async fn dismiss(&self, id: NotificationId, recipient: Recipient) -> AppResult<()> {
        self.store.dismiss(id, recipient).await
    }

    /// Deletes a notification.
    pub async fn delete(&self, id: NotificationId, recipient: Recipient) -> AppResult<()> {
        self.store.delete(id, recipient).await
    }

    /// Counts by state, kind, and display mode.
    pub async fn statistics(&self, recipient: Recipient) -> AppResult<NotificationStats> {
        self.store.statistics(recipient, Utc::now()).await
    }

    /// Delete every expired notification.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        self.store.cleanup_expired(Utc::now()).await
    }

    /// Trim one recipient's inbox to the configured cap.
    pub async fn enforce_limit(&self, recipient: Recipient) -> AppResult<u64> {
        self.store
            .enforce_limit(recipient, self.config.max_per_recipient, Utc::now())
            .await
    }

    /// Trim every inbox to the configured cap.
    pub async fn enforce_limit_all(&self) -> AppResult<u64> {
        self.store
            .enforce_limit_all(self.config.max_per_recipient, Utc::now())
            .await
    }
}
