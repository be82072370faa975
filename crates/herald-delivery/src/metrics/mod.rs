//! Read-only delivery metrics and health evaluation.

pub mod collector;
pub mod health;

pub use collector::{DeliveryMetrics, DeliveryMetricsCollector, WindowMetrics};
pub use health::DeliveryHealth;
