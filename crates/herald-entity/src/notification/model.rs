//! Notification entity model.

use chrono::{DateTime, Duration, Utc};
use herald_core::Recipient;
use herald_core::types::NotificationId;
use serde::{Deserialize, Serialize};

use super::kind::{DisplayMode, NotificationKind};

/// Optional call-to-action attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Button label.
    pub label: String,
    /// Target URL.
    pub url: String,
}

/// An inbox entry owned by exactly one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique, time-ordered identifier.
    pub id: NotificationId,
    /// Owner of the notification.
    pub recipient: Recipient,
    /// Producer-chosen kind.
    pub kind: NotificationKind,
    /// Rendering hint.
    pub display_mode: DisplayMode,
    /// Title text.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Optional call-to-action.
    pub action: Option<NotificationAction>,
    /// Whether the recipient has read it.
    pub read: bool,
    /// Whether the recipient dismissed it. Independent of `read`.
    pub dismissed: bool,
    /// When it was read.
    pub read_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry time; never returned by reads once past.
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the notification has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether it shows up in the recipient's inbox listing at `now`.
    pub fn is_listed_at(&self, now: DateTime<Utc>) -> bool {
        !self.dismissed && !self.is_expired_at(now)
    }

    /// Whether it counts as unread at `now`.
    pub fn is_unread_at(&self, now: DateTime<Utc>) -> bool {
        !self.read && self.is_listed_at(now)
    }
}

/// Data required to create a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// Owner.
    pub recipient: Recipient,
    /// Kind.
    pub kind: NotificationKind,
    /// Rendering hint.
    pub display_mode: DisplayMode,
    /// Title text.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Optional call-to-action.
    pub action: Option<NotificationAction>,
    /// Explicit expiry; `None` uses the configured TTL.
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewNotification {
    /// Materialize the row, assigning an id and resolving the expiry.
    pub fn into_notification(self, now: DateTime<Utc>, default_ttl_days: i64) -> Notification {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + Duration::days(default_ttl_days));
        Notification {
            id: NotificationId::new(),
            recipient: self.recipient,
            kind: self.kind,
            display_mode: self.display_mode,
            title: self.title,
            body: self.body,
            action: self.action,
            read: false,
            dismissed: false,
            read_at: None,
            created_at: now,
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewNotification {
        NewNotification {
            recipient: Recipient::User(1),
            kind: NotificationKind::Info,
            display_mode: DisplayMode::Center,
            title: "Hello".to_string(),
            body: "World".to_string(),
            action: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_default_expiry() {
        let now = Utc::now();
        let n = sample().into_notification(now, 30);
        assert_eq!(n.expires_at, now + Duration::days(30));
        assert!(n.is_unread_at(now));
        assert!(!n.is_listed_at(now + Duration::days(31)));
    }

    #[test]
    fn test_dismissed_is_not_read() {
        let now = Utc::now();
        let mut n = sample().into_notification(now, 30);
        n.dismissed = true;
        assert!(!n.read);
        assert!(!n.is_listed_at(now));
    }
}
