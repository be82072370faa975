//! # herald-database
//!
//! Persistence for Herald: the store traits consumed by the upper layers,
//! a PostgreSQL implementation (sqlx), an in-memory implementation for
//! single-process deployments and tests, and the [`StoreManager`] that
//! picks one at startup.

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod provider;
pub mod store;

pub use connection::DatabasePool;
pub use provider::StoreManager;
pub use store::{
    DeliveryAggregate, DeliveryStore, NotificationStore, PreferenceStore, StateCounts,
};
