//! Per-recipient delivery preferences.

pub mod model;

pub use model::DeliveryPreference;
