//! Delivery preference management.

pub mod service;

pub use service::{PreferenceService, PreferenceUpdate};
