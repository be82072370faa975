//! # herald-delivery
//!
//! The durable delivery queue and everything that drains it:
//!
//! - [`queue::DeliveryQueue`]: the `queued → sending → delivered / failed →
//!   queued / dead_letter` state machine
//! - [`channel`]: the `ChannelSender` capability and its email and webhook
//!   implementations, resolved through `ChannelRegistry`
//! - [`runner::DeliveryRunner`]: the polling drain loop
//! - [`metrics`]: read-only aggregation and health thresholds

pub mod backoff;
pub mod channel;
pub mod metrics;
pub mod queue;
pub mod runner;
pub mod template;

pub use channel::{ChannelRegistry, ChannelSender, SendError};
pub use metrics::{DeliveryHealth, DeliveryMetrics, DeliveryMetricsCollector};
pub use queue::{DeliveryQueue, EnqueueRequest};
pub use runner::DeliveryRunner;
