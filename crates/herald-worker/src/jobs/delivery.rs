//! Delivery queue upkeep: crash recovery and delivered-row purge.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tracing;

use herald_delivery::DeliveryQueue;

use crate::executor::{TaskExecutionError, TaskHandler};

/// Fails and resolves `sending` rows abandoned by a crashed drain worker
#[derive(Debug)]
pub struct DeliveryRecoveryTask {
    queue: Arc<DeliveryQueue>,
    stale_after: Duration,
}

impl DeliveryRecoveryTask {
    /// Task name
    pub const NAME: &'static str = "delivery_recovery";

    /// Create the task using the queue's `stale_sending_seconds`
    pub fn new(queue: Arc<DeliveryQueue>) -> Self {
        let stale_after =
            Duration::seconds(i64::try_from(queue.config().stale_sending_seconds).unwrap_or(i64::MAX / 1000));
        Self { queue, stale_after }
    }
}

#[async_trait]
impl TaskHandler for DeliveryRecoveryTask {
    fn task_name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self) -> Result<Value, TaskExecutionError> {
        let recovered = self
            .queue
            .recover_stale(Utc::now() - self.stale_after)
            .await
            .map_err(|e| TaskExecutionError::Transient(format!("Stale delivery recovery failed: {e}")))?;

        if recovered > 0 {
            tracing::warn!(recovered, "Recovered abandoned deliveries");
        }

        Ok(serde_json::json!({
            "task": Self::NAME,
            "recovered": recovered,
        }))
    }
}

/// Deletes delivered rows past the retention window. Dead letters are kept.
#[derive(Debug)]
pub struct DeliveryPurgeTask {
    queue: Arc<DeliveryQueue>,
    retention: Duration,
}

impl DeliveryPurgeTask {
    /// Task name
    pub const NAME: &'static str = "delivery_purge";

    /// Create the task using the queue's `delivered_retention_days`
    pub fn new(queue: Arc<DeliveryQueue>) -> Self {
        let retention = Duration::days(queue.config().delivered_retention_days);
        Self { queue, retention }
    }
}

#[async_trait]
impl TaskHandler for DeliveryPurgeTask {
    fn task_name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self) -> Result<Value, TaskExecutionError> {
        let cutoff = Utc::now() - self.retention;
        let purged = self
            .queue
            .purge_delivered(cutoff)
            .await
            .map_err(|e| TaskExecutionError::Transient(format!("Delivered purge failed: {e}")))?;

        tracing::info!(purged, cutoff = %cutoff, "Delivered rows purged");

        Ok(serde_json::json!({
            "task": Self::NAME,
            "purged": purged,
        }))
    }
}

#[cfg(test)]
mod tests {
    use herald_core::Recipient;
    use herald_core::config::{DeliveryConfig, RealtimeConfig};
    use herald_database::memory::MemoryDeliveryStore;
    use herald_delivery::EnqueueRequest;
    use herald_entity::delivery::{DeliveryChannel, DeliveryState};
    use herald_realtime::Hub;

    use super::*;

    fn queue(config: DeliveryConfig) -> Arc<DeliveryQueue> {
        Arc::new(DeliveryQueue::new(
            Arc::new(MemoryDeliveryStore::new()),
            Arc::new(Hub::new(RealtimeConfig::default())),
            config,
        ))
    }

    #[tokio::test]
    async fn test_recovery_requeues_abandoned_sends() {
        let queue = queue(DeliveryConfig {
            stale_sending_seconds: 0,
            ..Default::default()
        });
        let id = queue
            .enqueue(EnqueueRequest::new(Some(Recipient::User(1)), DeliveryChannel::Email, "s", "b"))
            .await
            .unwrap();
        queue.claim(&[DeliveryChannel::Email], 1).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let summary = DeliveryRecoveryTask::new(Arc::clone(&queue))
            .execute()
            .await
            .unwrap();
        assert_eq!(summary["recovered"], 1);

        let item = queue.get(id).await.unwrap();
        assert_eq!(item.state, DeliveryState::Queued);
        assert_eq!(item.retry_count, 1);
    }

    #[tokio::test]
    async fn test_purge_keeps_recent_rows() {
        let queue = queue(DeliveryConfig::default());
        let id = queue
            .enqueue(EnqueueRequest::new(Some(Recipient::User(1)), DeliveryChannel::Email, "s", "b"))
            .await
            .unwrap();
        queue.claim(&[DeliveryChannel::Email], 1).await.unwrap();
        queue.mark_delivered(id).await.unwrap();

        let summary = DeliveryPurgeTask::new(Arc::clone(&queue)).execute().await.unwrap();
        assert_eq!(summary["purged"], 0);
        assert!(queue.get(id).await.is_ok());
    }
}
