//! # herald-api
//!
//! HTTP API layer for Herald built on Axum.
//!
//! Provides the inbox, preference, producer, delivery queue and health
//! endpoints, the WebSocket upgrade that feeds the connection hub, request
//! extractors, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
