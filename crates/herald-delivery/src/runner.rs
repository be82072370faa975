//! Drain loop: claims due items and hands them to their channel senders.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, error, info, warn};

use herald_core::{AppError, AppResult};
use herald_entity::delivery::{DeliveryItem, DeliveryState};

use crate::channel::{ChannelRegistry, ChannelSender, SendError};
use crate::queue::DeliveryQueue;

/// Polls the delivery queue and executes sends with bounded concurrency.
#[derive(Debug)]
pub struct DeliveryRunner {
    queue: Arc<DeliveryQueue>,
    registry: Arc<ChannelRegistry>,
    semaphore: Arc<Semaphore>,
    batch_size: usize,
    poll_interval: Duration,
    send_timeout: Duration,
}

impl DeliveryRunner {
    /// Create a runner using the queue's configuration.
    pub fn new(queue: Arc<DeliveryQueue>, registry: Arc<ChannelRegistry>) -> Self {
        let config = queue.config();
        Self {
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            batch_size: config.batch_size.max(1),
            poll_interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
            send_timeout: Duration::from_secs(config.send_timeout_seconds.max(1)),
            queue,
            registry,
        }
    }

    /// Run until the cancel signal is received.
    ///
    /// Cancellation is only observed between batches: a claimed batch is
    /// always driven to `delivered` or `failed`, each send bounded by the
    /// send timeout.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            channels = ?self.registry.channels(),
            batch_size = self.batch_size,
            poll_interval_secs = self.poll_interval.as_secs(),
            "Delivery runner started"
        );

        loop {
            if *cancel.borrow() {
                break;
            }

            let backlog = match self.drain_once().await {
                Ok(count) => count >= self.batch_size,
                Err(e) => {
                    error!(error = %e, "Failed to drain delivery queue");
                    false
                }
            };
            if backlog {
                continue;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        info!("Delivery runner stopped");
    }

    /// Claim one batch and send every item in it. Returns the batch size.
    pub async fn drain_once(&self) -> AppResult<usize> {
        let channels = self.registry.channels();
        let items = self.queue.claim(&channels, self.batch_size).await?;
        let count = items.len();
        if count == 0 {
            return Ok(0);
        }
        debug!(count, "Claimed deliveries");

        let mut tasks = JoinSet::new();
        for item in items {
            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|e| AppError::internal(format!("Delivery semaphore closed: {e}")))?;
            let queue = Arc::clone(&self.queue);
            let sender = self.registry.get(item.channel);
            let timeout = self.send_timeout;

            tasks.spawn(async move {
                let _permit = permit;
                process(&queue, sender, item, timeout).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Delivery task panicked");
            }
        }

        Ok(count)
    }
}

/// Send one claimed item and record the outcome.
async fn process(
    queue: &DeliveryQueue,
    sender: Option<Arc<dyn ChannelSender>>,
    item: DeliveryItem,
    timeout: Duration,
) {
    let result = match sender {
        Some(sender) => match time::timeout(
            timeout,
            sender.send(item.address.as_deref(), &item.subject, &item.body),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(timeout.as_secs())),
        },
        None => Err(SendError::NotConfigured(item.channel)),
    };

    match result {
        Ok(()) => match queue.mark_delivered(item.id).await {
            Ok(_) => debug!(delivery_id = %item.id, channel = %item.channel, "Delivered"),
            Err(e) => error!(delivery_id = %item.id, error = %e, "Failed to mark delivered"),
        },
        Err(send_err) => match queue.mark_failed(item.id, &send_err.to_string()).await {
            Ok(DeliveryState::DeadLetter) => {}
            Ok(state) => warn!(
                delivery_id = %item.id,
                channel = %item.channel,
                error = %send_err,
                state = %state,
                "Delivery attempt failed"
            ),
            Err(e) => error!(delivery_id = %item.id, error = %e, "Failed to mark failed"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use herald_core::Recipient;
    use herald_core::config::{DeliveryConfig, RealtimeConfig};
    use herald_database::memory::MemoryDeliveryStore;
    use herald_entity::delivery::DeliveryChannel;
    use herald_realtime::Hub;

    use super::*;
    use crate::queue::EnqueueRequest;

    #[derive(Debug)]
    struct MockSender {
        channel: DeliveryChannel,
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockSender {
        fn new(channel: DeliveryChannel, fail: bool) -> Arc<Self> {
            Self::slow(channel, fail, Duration::ZERO)
        }

        fn slow(channel: DeliveryChannel, fail: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                channel,
                fail,
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChannelSender for MockSender {
        fn channel(&self) -> DeliveryChannel {
            self.channel
        }

        async fn send(&self, _: Option<&str>, _: &str, _: &str) -> Result<(), SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            if self.fail {
                Err(SendError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn setup(senders: Vec<Arc<MockSender>>) -> (DeliveryRunner, Arc<DeliveryQueue>) {
        let config = DeliveryConfig {
            max_retries: 1,
            ..Default::default()
        };
        let queue = Arc::new(DeliveryQueue::new(
            Arc::new(MemoryDeliveryStore::new()),
            Arc::new(Hub::new(RealtimeConfig::default())),
            config,
        ));
        let mut registry = ChannelRegistry::new();
        for sender in senders {
            registry.register(sender);
        }
        (DeliveryRunner::new(Arc::clone(&queue), Arc::new(registry)), queue)
    }

    fn request(channel: DeliveryChannel) -> EnqueueRequest {
        EnqueueRequest::new(Some(Recipient::User(1)), channel, "subject", "body")
            .with_address("ada@example.com")
    }

    #[tokio::test]
    async fn test_drain_delivers_and_dead_letters() {
        let email = MockSender::new(DeliveryChannel::Email, false);
        let slack = MockSender::new(DeliveryChannel::Slack, true);
        let (runner, queue) = setup(vec![Arc::clone(&email), Arc::clone(&slack)]);

        let ok = queue.enqueue(request(DeliveryChannel::Email)).await.unwrap();
        let bad = queue.enqueue(request(DeliveryChannel::Slack)).await.unwrap();
        let orphan = queue.enqueue(request(DeliveryChannel::Sms)).await.unwrap();

        assert_eq!(runner.drain_once().await.unwrap(), 2);
        assert_eq!(email.calls.load(Ordering::SeqCst), 1);
        assert_eq!(slack.calls.load(Ordering::SeqCst), 1);

        assert_eq!(queue.get(ok).await.unwrap().state, DeliveryState::Delivered);
        let dead = queue.get(bad).await.unwrap();
        assert_eq!(dead.state, DeliveryState::DeadLetter);
        assert!(dead.last_error.unwrap().contains("connection refused"));
        // No sender for SMS: never claimed.
        assert_eq!(queue.get(orphan).await.unwrap().state, DeliveryState::Queued);

        assert_eq!(runner.drain_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (runner, _) = setup(Vec::new());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });
        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_finishes_in_flight_sends() {
        let webhook = MockSender::slow(DeliveryChannel::Webhook, false, Duration::from_millis(300));
        let (runner, queue) = setup(vec![Arc::clone(&webhook)]);
        let id = queue.enqueue(request(DeliveryChannel::Webhook)).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(webhook.calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.get(id).await.unwrap().state, DeliveryState::Sending);
        tx.send(true).unwrap();

        time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queue.get(id).await.unwrap().state, DeliveryState::Delivered);
    }
}
