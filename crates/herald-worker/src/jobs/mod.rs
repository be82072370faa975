//! Built-in maintenance tasks.

pub mod delivery;
pub mod notification;

pub use delivery::{DeliveryPurgeTask, DeliveryRecoveryTask};
pub use notification::NotificationRetentionTask;
