//! HTTP and WebSocket handlers.

pub mod delivery;
pub mod health;
pub mod notification;
pub mod notify;
pub mod preference;
pub mod ws;
