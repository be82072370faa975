//! Scheduled maintenance for Herald.
//!
//! This crate provides:
//! - A task executor that dispatches named tasks to their handlers
//! - A cron scheduler that runs them periodically
//! - Built-in tasks for inbox retention and delivery queue upkeep

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{TaskExecutionError, TaskExecutor, TaskHandler};
pub use scheduler::CronScheduler;
