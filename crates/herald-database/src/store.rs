//! Store traits consumed by the service, delivery, and API layers.
//!
//! Every operation that reads "now" takes it as a parameter so retention
//! and scheduling decisions are reproducible.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herald_core::Recipient;
use herald_core::result::AppResult;
use herald_core::types::{DeliveryId, NotificationId, PageRequest, PageResponse};
use herald_entity::delivery::{DeliveryChannel, DeliveryItem, DeliveryState};
use herald_entity::notification::{Notification, NotificationStats};
use herald_entity::preference::DeliveryPreference;

/// Persistence for inbox notifications.
///
/// Operations addressing a single notification take both its id and the
/// caller's recipient; a mismatch is reported as `NotFound`.
#[async_trait]
pub trait NotificationStore: Send + Sync + Debug {
    /// Insert a fully materialized notification.
    async fn create(&self, notification: &Notification) -> AppResult<()>;

    /// Fetch one non-expired notification owned by `recipient`.
    async fn get_by_id(
        &self,
        id: NotificationId,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<Notification>;

    /// Non-expired, non-dismissed notifications, newest first.
    async fn list_by_recipient(
        &self,
        recipient: Recipient,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>>;

    /// Non-expired, unread, non-dismissed notifications, newest first.
    async fn list_unread(
        &self,
        recipient: Recipient,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>>;

    /// Number of non-expired, unread, non-dismissed notifications.
    async fn unread_count(&self, recipient: Recipient, now: DateTime<Utc>) -> AppResult<u64>;

    /// Set `read`. Idempotent.
    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Mark every unread notification read; returns how many changed.
    async fn mark_all_read(&self, recipient: Recipient, now: DateTime<Utc>) -> AppResult<u64>;

    /// Set `dismissed` without touching `read`. Idempotent.
    async fn dismiss(&self, id: NotificationId, recipient: Recipient) -> AppResult<()>;

    /// Hard delete.
    async fn delete(&self, id: NotificationId, recipient: Recipient) -> AppResult<()>;

    /// Delete rows with `expires_at <= now`; returns the number deleted.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Keep only the newest `cap` non-expired rows of `recipient`.
    async fn enforce_limit(
        &self,
        recipient: Recipient,
        cap: u64,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// [`enforce_limit`](Self::enforce_limit) for every recipient.
    async fn enforce_limit_all(&self, cap: u64, now: DateTime<Utc>) -> AppResult<u64>;

    /// Aggregate counts over the recipient's non-expired rows.
    async fn statistics(
        &self,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationStats>;
}

/// Persistence for delivery queue rows.
///
/// State-changing operations are compare-and-set on the current state and
/// return `None` when the row is missing or not in the expected state.
#[async_trait]
pub trait DeliveryStore: Send + Sync + Debug {
    /// Insert a new row.
    async fn insert(&self, item: &DeliveryItem) -> AppResult<()>;

    /// Fetch a row by id.
    async fn get(&self, id: DeliveryId) -> AppResult<Option<DeliveryItem>>;

    /// Move up to `limit` due `queued` rows on `channels` to `sending`,
    /// highest priority then oldest first.
    async fn claim_due(
        &self,
        channels: &[DeliveryChannel],
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DeliveryItem>>;

    /// `sending -> delivered`.
    async fn mark_delivered(
        &self,
        id: DeliveryId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>>;

    /// `sending -> failed`, incrementing `retry_count`.
    async fn mark_failed(
        &self,
        id: DeliveryId,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>>;

    /// `failed -> queued`, due at `next_attempt_at`.
    async fn requeue(
        &self,
        id: DeliveryId,
        next_attempt_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>>;

    /// `failed -> dead_letter`.
    async fn dead_letter(
        &self,
        id: DeliveryId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>>;

    /// `sending -> failed` for every row last updated before `older_than`.
    async fn fail_stale_sending(
        &self,
        older_than: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DeliveryItem>>;

    /// Rows in `state`, newest first.
    async fn list_by_state(
        &self,
        state: DeliveryState,
        page: PageRequest,
    ) -> AppResult<PageResponse<DeliveryItem>>;

    /// Delete `delivered` rows delivered before `before`.
    async fn purge_delivered(&self, before: DateTime<Utc>) -> AppResult<u64>;

    /// Counts and latency over rows created at or after `since` (all rows
    /// when `None`).
    async fn aggregate(&self, since: Option<DateTime<Utc>>) -> AppResult<DeliveryAggregate>;

    /// Queued rows on drainable channels whose `next_attempt_at` is before
    /// `before`.
    async fn count_overdue(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Persistence for per-recipient delivery preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync + Debug {
    /// Saved preferences, if any.
    async fn get(&self, recipient: Recipient) -> AppResult<Option<DeliveryPreference>>;

    /// Insert or replace.
    async fn upsert(&self, preference: &DeliveryPreference) -> AppResult<DeliveryPreference>;
}

/// Row counts per delivery state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    /// `queued` rows.
    pub queued: u64,
    /// `sending` rows.
    pub sending: u64,
    /// `delivered` rows.
    pub delivered: u64,
    /// `failed` rows.
    pub failed: u64,
    /// `dead_letter` rows.
    pub dead_letter: u64,
}

impl StateCounts {
    /// Add `count` rows in `state`.
    pub fn add(&mut self, state: DeliveryState, count: u64) {
        match state {
            DeliveryState::Queued => self.queued += count,
            DeliveryState::Sending => self.sending += count,
            DeliveryState::Delivered => self.delivered += count,
            DeliveryState::Failed => self.failed += count,
            DeliveryState::DeadLetter => self.dead_letter += count,
        }
    }

    /// Sum over all states.
    pub fn total(&self) -> u64 {
        self.queued + self.sending + self.delivered + self.failed + self.dead_letter
    }
}

/// Raw aggregate over the delivery queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryAggregate {
    /// Counts per state.
    pub by_state: StateCounts,
    /// Counts per channel name.
    pub by_channel: BTreeMap<String, u64>,
    /// Counts per priority name.
    pub by_priority: BTreeMap<String, u64>,
    /// `queued` rows on the live channel; these are never drained.
    pub live_queued: u64,
    /// Mean `delivered_at - created_at` in milliseconds over delivered rows.
    pub avg_latency_ms: Option<f64>,
}
