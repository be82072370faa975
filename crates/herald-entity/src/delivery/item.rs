//! Delivery item entity model.

use chrono::{DateTime, Utc};
use herald_core::Recipient;
use herald_core::types::DeliveryId;
use serde::{Deserialize, Serialize};

use super::channel::DeliveryChannel;
use super::priority::DeliveryPriority;
use super::state::DeliveryState;

/// A durable delivery queue row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryItem {
    /// Unique, time-ordered identifier.
    pub id: DeliveryId,
    /// Target recipient; `None` means broadcast.
    pub recipient: Option<Recipient>,
    /// Transport.
    pub channel: DeliveryChannel,
    /// Resolved channel address (email address, webhook URL, ...).
    pub address: Option<String>,
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Priority.
    pub priority: DeliveryPriority,
    /// Current state.
    pub state: DeliveryState,
    /// Number of failed send attempts.
    pub retry_count: i32,
    /// Error from the last failed attempt.
    pub last_error: Option<String>,
    /// Earliest time a worker may claim the item.
    pub next_attempt_at: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
    /// When the item reached `delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl DeliveryItem {
    /// Whether the item targets every connected recipient.
    pub fn is_broadcast(&self) -> bool {
        self.recipient.is_none()
    }

    /// Time from creation to delivery, for delivered items.
    pub fn latency(&self) -> Option<chrono::Duration> {
        self.delivered_at.map(|at| at - self.created_at)
    }

    /// Whether a worker may claim the item at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == DeliveryState::Queued && self.next_attempt_at <= now
    }
}

/// Data required to insert a delivery item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeliveryItem {
    /// Target recipient; `None` means broadcast.
    pub recipient: Option<Recipient>,
    /// Transport.
    pub channel: DeliveryChannel,
    /// Resolved channel address.
    pub address: Option<String>,
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Priority.
    pub priority: DeliveryPriority,
    /// Initial state: `queued`, or `delivered` for a live push that succeeded.
    pub state: DeliveryState,
}

impl NewDeliveryItem {
    /// Materialize the row at `now`.
    pub fn into_item(self, now: DateTime<Utc>) -> DeliveryItem {
        let delivered_at = (self.state == DeliveryState::Delivered).then_some(now);
        DeliveryItem {
            id: DeliveryId::new(),
            recipient: self.recipient,
            channel: self.channel,
            address: self.address,
            subject: self.subject,
            body: self.body,
            priority: self.priority,
            state: self.state,
            retry_count: 0,
            last_error: None,
            next_attempt_at: now,
            created_at: now,
            updated_at: now,
            delivered_at,
        }
    }
}
