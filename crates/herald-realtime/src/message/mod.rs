//! Wire frames exchanged with live clients.

pub mod serializer;
pub mod types;

pub use types::{DeliveryPayload, InboundFrame, NotificationPayload, OutboundFrame};
