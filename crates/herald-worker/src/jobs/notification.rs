//! Inbox retention sweep.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use herald_service::NotificationService;

use crate::executor::{TaskExecutionError, TaskHandler};

/// Deletes expired notifications and trims every inbox to the cap
#[derive(Debug)]
pub struct NotificationRetentionTask {
    notifications: Arc<NotificationService>,
}

impl NotificationRetentionTask {
    /// Task name
    pub const NAME: &'static str = "notification_retention";

    /// Create the task
    pub fn new(notifications: Arc<NotificationService>) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl TaskHandler for NotificationRetentionTask {
    fn task_name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self) -> Result<Value, TaskExecutionError> {
        let expired = self.notifications.cleanup_expired().await.map_err(|e| {
            TaskExecutionError::Transient(format!("Expired notification cleanup failed: {e}"))
        })?;
        let overflow = self.notifications.enforce_limit_all().await.map_err(|e| {
            TaskExecutionError::Transient(format!("Inbox trim failed: {e}"))
        })?;

        tracing::info!(expired, overflow, "Notification retention sweep complete");

        Ok(serde_json::json!({
            "task": Self::NAME,
            "expired_removed": expired,
            "overflow_removed": overflow,
        }))
    }
}
