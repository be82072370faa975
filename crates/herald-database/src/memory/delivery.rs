use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::types::{DeliveryId, PageRequest, PageResponse};
use herald_entity::delivery::{DeliveryChannel, DeliveryItem, DeliveryState};

use super::paginate;
use crate::store::{DeliveryAggregate, DeliveryStore};

/// In-memory [`DeliveryStore`].
#[derive(Debug, Default)]
pub struct MemoryDeliveryStore {
    rows: RwLock<HashMap<DeliveryId, DeliveryItem>>,
}

impl MemoryDeliveryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Apply `from -> to` if the row is in `from`; the single write path for
/// state changes.
fn transition(
    rows: &mut HashMap<DeliveryId, DeliveryItem>,
    id: DeliveryId,
    from: DeliveryState,
    to: DeliveryState,
    now: DateTime<Utc>,
) -> Option<&mut DeliveryItem> {
    let item = rows.get_mut(&id)?;
    if item.state != from || !from.can_transition_to(to) {
        return None;
    }
    item.state = to;
    item.updated_at = now;
    Some(item)
}

#[async_trait]
impl DeliveryStore for MemoryDeliveryStore {
    async fn insert(&self, item: &DeliveryItem) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&item.id) {
            return Err(AppError::conflict(format!(
                "Delivery item {} already exists",
                item.id
            )));
        }
        rows.insert(item.id, item.clone());
        Ok(())
    }

    async fn get(&self, id: DeliveryId) -> AppResult<Option<DeliveryItem>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn claim_due(
        &self,
        channels: &[DeliveryChannel],
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DeliveryItem>> {
        let mut rows = self.rows.write().await;
        let mut due: Vec<&DeliveryItem> = rows
            .values()
            .filter(|i| i.is_due(now) && channels.contains(&i.channel))
            .collect();
        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        let ids: Vec<DeliveryId> = due.into_iter().take(limit).map(|i| i.id).collect();

        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) =
                transition(&mut rows, id, DeliveryState::Queued, DeliveryState::Sending, now)
            {
                claimed.push(item.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_delivered(
        &self,
        id: DeliveryId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        let mut rows = self.rows.write().await;
        Ok(
            transition(&mut rows, id, DeliveryState::Sending, DeliveryState::Delivered, now).map(
                |item| {
                    item.delivered_at = Some(now);
                    item.clone()
                },
            ),
        )
    }

    async fn mark_failed(
        &self,
        id: DeliveryId,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        let mut rows = self.rows.write().await;
        Ok(
            transition(&mut rows, id, DeliveryState::Sending, DeliveryState::Failed, now).map(
                |item| {
                    item.retry_count += 1;
                    item.last_error = Some(error.to_string());
                    item.clone()
                },
            ),
        )
    }

    async fn requeue(
        &self,
        id: DeliveryId,
        next_attempt_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        let mut rows = self.rows.write().await;
        Ok(
            transition(&mut rows, id, DeliveryState::Failed, DeliveryState::Queued, now).map(
                |item| {
                    item.next_attempt_at = next_attempt_at;
                    item.clone()
                },
            ),
        )
    }

    async fn dead_letter(
        &self,
        id: DeliveryId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        let mut rows = self.rows.write().await;
        Ok(
            transition(&mut rows, id, DeliveryState::Failed, DeliveryState::DeadLetter, now)
                .map(|item| item.clone()),
        )
    }

    async fn fail_stale_sending(
        &self,
        older_than: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DeliveryItem>> {
        let mut rows = self.rows.write().await;
        let stale: Vec<DeliveryId> = rows
            .values()
            .filter(|i| i.state == DeliveryState::Sending && i.updated_at < older_than)
            .map(|i| i.id)
            .collect();

        let mut failed = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(item) =
                transition(&mut rows, id, DeliveryState::Sending, DeliveryState::Failed, now)
            {
                item.retry_count += 1;
                item.last_error = Some(error.to_string());
                failed.push(item.clone());
            }
        }
        Ok(failed)
    }

    async fn list_by_state(
        &self,
        state: DeliveryState,
        page: PageRequest,
    ) -> AppResult<PageResponse<DeliveryItem>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<DeliveryItem> =
            rows.values().filter(|i| i.state == state).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(matching, page))
    }

    async fn purge_delivered(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let count = rows.len();
        rows.retain(|_, i| {
            !(i.state == DeliveryState::Delivered
                && i.delivered_at.is_some_and(|at| at < before))
        });
        Ok((count - rows.len()) as u64)
    }

    async fn aggregate(&self, since: Option<DateTime<Utc>>) -> AppResult<DeliveryAggregate> {
        let rows = self.rows.read().await;
        let mut agg = DeliveryAggregate::default();
        let mut latency_total_ms = 0f64;
        let mut latency_samples = 0u64;

        for item in rows
            .values()
            .filter(|i| since.is_none_or(|s| i.created_at >= s))
        {
            agg.by_state.add(item.state, 1);
            *agg.by_channel
                .entry(item.channel.as_str().to_string())
                .or_default() += 1;
            *agg.by_priority
                .entry(item.priority.as_str().to_string())
                .or_default() += 1;
            if item.channel.is_live() && item.state == DeliveryState::Queued {
                agg.live_queued += 1;
            }
            if item.state == DeliveryState::Delivered {
                if let Some(latency) = item.latency() {
                    latency_total_ms += latency.num_milliseconds() as f64;
                    latency_samples += 1;
                }
            }
        }

        if latency_samples > 0 {
            agg.avg_latency_ms = Some(latency_total_ms / latency_samples as f64);
        }
        Ok(agg)
    }

    async fn count_overdue(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|i| {
                i.state == DeliveryState::Queued
                    && !i.channel.is_live()
                    && i.next_attempt_at < before
            })
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use herald_core::Recipient;
    use herald_entity::delivery::{DeliveryPriority, NewDeliveryItem};

    use super::*;

    fn queued(channel: DeliveryChannel, priority: DeliveryPriority, at: DateTime<Utc>) -> DeliveryItem {
        NewDeliveryItem {
            recipient: Some(Recipient::User(1)),
            channel,
            address: None,
            subject: "s".to_string(),
            body: "b".to_string(),
            priority,
            state: DeliveryState::Queued,
        }
        .into_item(at)
    }

    #[tokio::test]
    async fn test_claim_orders_by_priority_then_age() {
        let store = MemoryDeliveryStore::new();
        let now = Utc::now();
        let old_low = queued(DeliveryChannel::Email, DeliveryPriority::Low, now - Duration::seconds(30));
        let new_high = queued(DeliveryChannel::Email, DeliveryPriority::High, now);
        let old_high = queued(DeliveryChannel::Email, DeliveryPriority::High, now - Duration::seconds(10));
        for item in [&old_low, &new_high, &old_high] {
            store.insert(item).await.unwrap();
        }

        let claimed = store
            .claim_due(&[DeliveryChannel::Email], 2, now)
            .await
            .unwrap();
        let ids: Vec<_> = claimed.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![old_high.id, new_high.id]);
        assert!(claimed.iter().all(|i| i.state == DeliveryState::Sending));
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let store = MemoryDeliveryStore::new();
        let now = Utc::now();
        store
            .insert(&queued(DeliveryChannel::Webhook, DeliveryPriority::Normal, now))
            .await
            .unwrap();

        let first = store.claim_due(&[DeliveryChannel::Webhook], 10, now).await.unwrap();
        let second = store.claim_due(&[DeliveryChannel::Webhook], 10, now).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_claim_skips_other_channels_and_future_items() {
        let store = MemoryDeliveryStore::new();
        let now = Utc::now();
        store
            .insert(&queued(DeliveryChannel::Sms, DeliveryPriority::Normal, now))
            .await
            .unwrap();
        let mut later = queued(DeliveryChannel::Email, DeliveryPriority::Normal, now);
        later.next_attempt_at = now + Duration::seconds(60);
        store.insert(&later).await.unwrap();

        let claimed = store.claim_due(&[DeliveryChannel::Email], 10, now).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_states_refuse_updates() {
        let store = MemoryDeliveryStore::new();
        let now = Utc::now();
        let item = queued(DeliveryChannel::Email, DeliveryPriority::Normal, now);
        store.insert(&item).await.unwrap();
        store.claim_due(&[DeliveryChannel::Email], 1, now).await.unwrap();
        assert!(store.mark_delivered(item.id, now).await.unwrap().is_some());

        assert!(store.mark_failed(item.id, "late", now).await.unwrap().is_none());
        assert!(store.mark_delivered(item.id, now).await.unwrap().is_none());
        assert!(store.requeue(item.id, now, now).await.unwrap().is_none());
        let row = store.get(item.id).await.unwrap().unwrap();
        assert_eq!(row.state, DeliveryState::Delivered);
        assert_eq!(row.retry_count, 0);
        assert_eq!(row.delivered_at, Some(now));
    }

    #[tokio::test]
    async fn test_fail_stale_sending() {
        let store = MemoryDeliveryStore::new();
        let start = Utc::now();
        let item = queued(DeliveryChannel::Email, DeliveryPriority::Normal, start);
        store.insert(&item).await.unwrap();
        store.claim_due(&[DeliveryChannel::Email], 1, start).await.unwrap();

        let later = start + Duration::minutes(20);
        let failed = store
            .fail_stale_sending(later - Duration::minutes(10), "worker lost", later)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].retry_count, 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("worker lost"));
    }

    #[tokio::test]
    async fn test_aggregate_and_overdue() {
        let store = MemoryDeliveryStore::new();
        let now = Utc::now();
        let email = queued(DeliveryChannel::Email, DeliveryPriority::Normal, now - Duration::hours(2));
        let live = queued(DeliveryChannel::Live, DeliveryPriority::Normal, now - Duration::hours(2));
        store.insert(&email).await.unwrap();
        store.insert(&live).await.unwrap();

        let agg = store.aggregate(None).await.unwrap();
        assert_eq!(agg.by_state.queued, 2);
        assert_eq!(agg.live_queued, 1);
        assert_eq!(agg.by_channel.get("email"), Some(&1));
        assert_eq!(store.count_overdue(now - Duration::hours(1)).await.unwrap(), 1);

        let recent = store.aggregate(Some(now - Duration::hours(1))).await.unwrap();
        assert_eq!(recent.by_state.total(), 0);
    }
}
