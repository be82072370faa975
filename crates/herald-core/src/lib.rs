//! # herald-core
//!
//! Core crate for Herald. Contains configuration schemas, typed
//! identifiers, the recipient model, pagination types, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Herald crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use types::recipient::Recipient;
