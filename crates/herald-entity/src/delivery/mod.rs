//! Delivery queue domain entities.

pub mod channel;
pub mod item;
pub mod priority;
pub mod state;

pub use channel::DeliveryChannel;
pub use item::{DeliveryItem, NewDeliveryItem};
pub use priority::DeliveryPriority;
pub use state::DeliveryState;
