//! # herald-service
//!
//! Business logic on top of the stores, the hub, and the delivery queue:
//! the preference gate, preference and inbox services, the single
//! `Notifier::notify` entry point, and the per-recipient retention queue.

pub mod gate;
pub mod notification;
pub mod preference;
pub mod retention;

pub use gate::{DeliveryPlan, GateInput, PreferenceGate};
pub use notification::{Notifier, NotificationService, NotifyRequest};
pub use preference::{PreferenceService, PreferenceUpdate};
pub use retention::{RetentionQueue, RetentionWorker};
