//! Notification (inbox) domain entities.

pub mod kind;
pub mod model;
pub mod stats;

pub use kind::{DisplayMode, NotificationKind, Severity};
pub use model::{NewNotification, Notification, NotificationAction};
pub use stats::NotificationStats;
