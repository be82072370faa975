//! Inbound and outbound frame type definitions.
//!
//! Every frame is `{"type": <kind>, "data": <payload>}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herald_core::types::{DeliveryId, NotificationId};
use herald_entity::delivery::{DeliveryItem, DeliveryPriority};
use herald_entity::notification::Notification;

/// Frames sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Client-initiated liveness probe; answered with `pong`.
    Ping,
    /// Answer to a server `ping`.
    Pong,
    /// Mark a notification as read.
    MarkRead {
        /// Notification ID.
        id: NotificationId,
    },
}

/// Frames sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// A new inbox notification.
    Notification(NotificationPayload),
    /// A live delivery queue item.
    Delivery(DeliveryPayload),
    /// Server keepalive.
    Ping {
        /// Server timestamp (ms since epoch).
        timestamp: i64,
    },
    /// Answer to a client `ping`.
    Pong {
        /// Server timestamp (ms since epoch).
        timestamp: i64,
    },
}

impl OutboundFrame {
    /// A ping stamped with the current time.
    pub fn ping() -> Self {
        Self::Ping {
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// A pong stamped with the current time.
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Frame type name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::Delivery(_) => "delivery",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
        }
    }
}

/// Notification as pushed to the client, with the recipient's display
/// duration resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// The inbox entry.
    #[serde(flatten)]
    pub notification: Notification,
    /// Seconds to display; `None` means sticky.
    pub duration_secs: Option<u32>,
}

/// Live delivery queue item as pushed to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPayload {
    /// Delivery ID.
    pub id: DeliveryId,
    /// Subject.
    pub subject: String,
    /// Body.
    pub body: String,
    /// Priority.
    pub priority: DeliveryPriority,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&DeliveryItem> for DeliveryPayload {
    fn from(item: &DeliveryItem) -> Self {
        Self {
            id: item.id,
            subject: item.subject.clone(),
            body: item.body.clone(),
            priority: item.priority,
            created_at: item.created_at,
        }
    }
}
