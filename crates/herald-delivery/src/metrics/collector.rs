//! Aggregates delivery queue state into metrics and health reports.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herald_core::AppResult;
use herald_core::config::HealthThresholds;
use herald_database::{DeliveryAggregate, DeliveryStore, StateCounts};

use super::health::{DeliveryHealth, HealthInputs};

/// Counts and rates for one time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Rows created in the window.
    pub total: u64,
    /// Delivered rows.
    pub delivered: u64,
    /// Dead-lettered rows.
    pub dead_letter: u64,
    /// `delivered / total`.
    pub delivery_rate: f64,
    /// `dead_letter / (delivered + dead_letter)`.
    pub error_rate: f64,
    /// Mean creation-to-delivery latency.
    pub avg_latency_ms: Option<f64>,
}

impl From<&DeliveryAggregate> for WindowMetrics {
    fn from(agg: &DeliveryAggregate) -> Self {
        let counts = &agg.by_state;
        Self {
            total: counts.total(),
            delivered: counts.delivered,
            dead_letter: counts.dead_letter,
            delivery_rate: delivery_rate(counts),
            error_rate: error_rate(counts),
            avg_latency_ms: agg.avg_latency_ms,
        }
    }
}

/// Full metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    /// Counts per state.
    pub by_state: StateCounts,
    /// Counts per channel.
    pub by_channel: BTreeMap<String, u64>,
    /// Counts per priority.
    pub by_priority: BTreeMap<String, u64>,
    /// Drainable `queued + sending` rows.
    pub queue_depth: u64,
    /// Undeliverable live rows parked in `queued`.
    pub live_undelivered: u64,
    /// All-time figures.
    pub all_time: WindowMetrics,
    /// Last 24 hours.
    pub last_24h: WindowMetrics,
    /// Last 7 days.
    pub last_7d: WindowMetrics,
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
}

/// Read-only aggregator over a [`DeliveryStore`].
#[derive(Debug, Clone)]
pub struct DeliveryMetricsCollector {
    store: Arc<dyn DeliveryStore>,
    thresholds: HealthThresholds,
}

impl DeliveryMetricsCollector {
    /// Create a collector.
    pub fn new(store: Arc<dyn DeliveryStore>, thresholds: HealthThresholds) -> Self {
        Self { store, thresholds }
    }

    /// Metrics as of now.
    pub async fn collect(&self) -> AppResult<DeliveryMetrics> {
        self.collect_at(Utc::now()).await
    }

    /// Metrics as of `now`.
    pub async fn collect_at(&self, now: DateTime<Utc>) -> AppResult<DeliveryMetrics> {
        let all = self.store.aggregate(None).await?;
        let day = self
            .store
            .aggregate(Some(now - chrono::Duration::hours(24)))
            .await?;
        let week = self
            .store
            .aggregate(Some(now - chrono::Duration::days(7)))
            .await?;

        Ok(DeliveryMetrics {
            by_state: all.by_state,
            by_channel: all.by_channel.clone(),
            by_priority: all.by_priority.clone(),
            queue_depth: queue_depth(&all),
            live_undelivered: all.live_queued,
            all_time: WindowMetrics::from(&all),
            last_24h: WindowMetrics::from(&day),
            last_7d: WindowMetrics::from(&week),
            generated_at: now,
        })
    }

    /// Health as of now.
    pub async fn health(&self) -> AppResult<DeliveryHealth> {
        self.health_at(Utc::now()).await
    }

    /// Health as of `now`.
    pub async fn health_at(&self, now: DateTime<Utc>) -> AppResult<DeliveryHealth> {
        let all = self.store.aggregate(None).await?;
        let window = self
            .store
            .aggregate(Some(now - seconds(self.thresholds.error_window_seconds)))
            .await?;
        let stuck = self
            .store
            .count_overdue(now - seconds(self.thresholds.stuck_after_seconds))
            .await?;

        Ok(DeliveryHealth::evaluate(
            &self.thresholds,
            HealthInputs {
                queue_depth: queue_depth(&all),
                stuck_items: stuck,
                error_rate: error_rate(&window.by_state),
            },
            now,
        ))
    }
}

/// `queued + sending`, excluding live rows that will never drain.
fn queue_depth(agg: &DeliveryAggregate) -> u64 {
    (agg.by_state.queued + agg.by_state.sending).saturating_sub(agg.live_queued)
}

fn delivery_rate(counts: &StateCounts) -> f64 {
    ratio(counts.delivered, counts.total())
}

fn error_rate(counts: &StateCounts) -> f64 {
    ratio(counts.dead_letter, counts.delivered + counts.dead_letter)
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn seconds(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

#[cfg(test)]
mod tests {
    use herald_core::Recipient;
    use herald_database::memory::MemoryDeliveryStore;
    use herald_entity::delivery::{
        DeliveryChannel, DeliveryPriority, DeliveryState, NewDeliveryItem,
    };

    use super::*;

    async fn seed(store: &MemoryDeliveryStore, channel: DeliveryChannel, state: DeliveryState) {
        let item = NewDeliveryItem {
            recipient: Some(Recipient::User(1)),
            channel,
            address: None,
            subject: "s".into(),
            body: "b".into(),
            priority: DeliveryPriority::Normal,
            state,
        }
        .into_item(Utc::now());
        store.insert(&item).await.unwrap();
    }

    #[tokio::test]
    async fn test_rates_and_depth() {
        let store = Arc::new(MemoryDeliveryStore::new());
        seed(&store, DeliveryChannel::Live, DeliveryState::Delivered).await;
        seed(&store, DeliveryChannel::Live, DeliveryState::Delivered).await;
        seed(&store, DeliveryChannel::Live, DeliveryState::Delivered).await;
        seed(&store, DeliveryChannel::Live, DeliveryState::Queued).await;
        seed(&store, DeliveryChannel::Email, DeliveryState::Queued).await;

        let collector = DeliveryMetricsCollector::new(store, HealthThresholds::default());
        let metrics = collector.collect().await.unwrap();

        assert_eq!(metrics.by_state.total(), 5);
        assert_eq!(metrics.queue_depth, 1);
        assert_eq!(metrics.live_undelivered, 1);
        assert!((metrics.all_time.delivery_rate - 0.6).abs() < 1e-9);
        assert_eq!(metrics.all_time.error_rate, 0.0);
        assert_eq!(metrics.last_24h.total, 5);
        assert_eq!(metrics.by_channel.get("live"), Some(&4));
    }

    #[tokio::test]
    async fn test_health_flags_queue_depth_and_stuck_items() {
        let store = Arc::new(MemoryDeliveryStore::new());
        seed(&store, DeliveryChannel::Email, DeliveryState::Queued).await;
        seed(&store, DeliveryChannel::Email, DeliveryState::Queued).await;
        seed(&store, DeliveryChannel::Live, DeliveryState::Queued).await;

        let thresholds = HealthThresholds {
            max_queue_depth: 1,
            stuck_after_seconds: 60,
            ..Default::default()
        };
        let collector = DeliveryMetricsCollector::new(store, thresholds);

        let now_health = collector.health().await.unwrap();
        assert!(!now_health.healthy);
        assert_eq!(now_health.queue_depth, 2);
        assert_eq!(now_health.stuck_items, 0);
        assert_eq!(now_health.warnings.len(), 1);

        let later = collector
            .health_at(Utc::now() + chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(later.stuck_items, 2);
        assert_eq!(later.warnings.len(), 2);
    }
}
