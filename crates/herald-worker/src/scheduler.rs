//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use herald_core::error::AppError;

use crate::executor::{TaskExecutionError, TaskExecutor};
use crate::jobs::{DeliveryPurgeTask, DeliveryRecoveryTask, NotificationRetentionTask};

/// Stale `sending` recovery, every minute
const DELIVERY_RECOVERY_SCHEDULE: &str = "0 * * * * *";

/// Delivered-row purge, daily at 03:30
const DELIVERY_PURGE_SCHEDULE: &str = "0 30 3 * * *";

/// Cron-based scheduler that runs tasks through a [`TaskExecutor`]
pub struct CronScheduler {
    scheduler: JobScheduler,
    executor: Arc<TaskExecutor>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("tasks", &self.executor.registered_tasks())
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(executor: Arc<TaskExecutor>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            executor,
        })
    }

    /// Register the built-in tasks that have a handler in the executor.
    /// `retention_schedule` drives the inbox sweep.
    pub async fn register_default_tasks(&self, retention_schedule: &str) -> Result<(), AppError> {
        for (name, schedule) in [
            (NotificationRetentionTask::NAME, retention_schedule),
            (DeliveryRecoveryTask::NAME, DELIVERY_RECOVERY_SCHEDULE),
            (DeliveryPurgeTask::NAME, DELIVERY_PURGE_SCHEDULE),
        ] {
            if self.executor.has_handler(name) {
                self.register(name, schedule).await?;
            }
        }

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Run task `name` on the six-field cron `schedule`
    pub async fn register(&self, name: &str, schedule: &str) -> Result<(), AppError> {
        let executor = Arc::clone(&self.executor);
        let task = name.to_string();

        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let task = task.clone();
            Box::pin(async move {
                match executor.execute(&task).await {
                    Ok(summary) => tracing::debug!(task = %task, %summary, "Task finished"),
                    Err(TaskExecutionError::Transient(msg)) => {
                        tracing::warn!(task = %task, "Task failed, will retry next run: {msg}")
                    }
                    Err(e) => tracing::error!(task = %task, error = %e, "Task failed"),
                }
            })
        })
        .map_err(|e| AppError::configuration(format!("Invalid schedule '{schedule}' for {name}: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        tracing::info!(task = %name, schedule = %schedule, "Registered scheduled task");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
