//! # herald-entity
//!
//! Domain entity models for Herald. Every struct in this crate represents
//! a persisted row or a domain value object. Persistence-specific row
//! mapping lives in `herald-database`; these types carry the typed
//! domain view (recipients, enums, typed ids).

pub mod delivery;
pub mod notification;
pub mod preference;
