//! Shared domain types: identifiers, recipients, pagination.

pub mod id;
pub mod pagination;
pub mod recipient;

pub use id::{DeliveryId, NotificationId};
pub use pagination::{PageRequest, PageResponse};
pub use recipient::{Recipient, RecipientType};
