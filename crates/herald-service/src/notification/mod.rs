//! Inbox service and the notify entry point.

pub mod notifier;
pub mod service;

pub use notifier::{Notifier, NotifyRequest};
pub use service::NotificationService;
