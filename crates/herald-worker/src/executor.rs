//! Task executor: dispatches named tasks to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use herald_core::error::AppError;

/// Trait for maintenance task implementations
#[async_trait]
pub trait TaskHandler: Send + Sync + std::fmt::Debug {
    /// Name the task is registered and scheduled under
    fn task_name(&self) -> &str;

    /// Run the task once, returning a JSON summary
    async fn execute(&self) -> Result<Value, TaskExecutionError>;
}

/// Error from task execution
#[derive(Debug, thiserror::Error)]
pub enum TaskExecutionError {
    /// Permanent failure; the next run will fail the same way
    #[error("Permanent task failure: {0}")]
    Permanent(String),

    /// Transient failure; the next scheduled run may succeed
    #[error("Transient task failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Dispatches tasks to the appropriate handler by name
#[derive(Debug, Default)]
pub struct TaskExecutor {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskExecutor {
    /// Create an empty executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task handler
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        let name = handler.task_name().to_string();
        tracing::info!(task = %name, "Registered task handler");
        self.handlers.insert(name, handler);
    }

    /// Run the task registered under `name`
    pub async fn execute(&self, name: &str) -> Result<Value, TaskExecutionError> {
        let handler = self.handlers.get(name).ok_or_else(|| {
            TaskExecutionError::Permanent(format!("No handler registered for task '{name}'"))
        })?;

        tracing::debug!(task = %name, "Executing task");
        handler.execute().await
    }

    /// Check if a handler is registered for a task
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Names of registered tasks, sorted
    pub fn registered_tasks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
