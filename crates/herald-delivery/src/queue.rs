//! The delivery queue state machine.
//!
//! ```text
//! queued --claim--> sending --ok--> delivered
//!                   sending --err--> failed --retries left--> queued
//!                                    failed --exhausted----> dead_letter
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use herald_core::config::DeliveryConfig;
use herald_core::types::{DeliveryId, PageRequest, PageResponse};
use herald_core::{AppError, AppResult, Recipient};
use herald_database::DeliveryStore;
use herald_entity::delivery::{
    DeliveryChannel, DeliveryItem, DeliveryPriority, DeliveryState, NewDeliveryItem,
};
use herald_realtime::message::types::DeliveryPayload;
use herald_realtime::{Hub, OutboundFrame};

use crate::backoff::Backoff;
use crate::template;

/// Error recorded on `sending` rows abandoned by a crashed worker.
pub const WORKER_LOST: &str = "worker lost";

/// Parameters for [`DeliveryQueue::enqueue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    /// Target recipient; `None` broadcasts.
    #[serde(default)]
    pub recipient: Option<Recipient>,
    /// Transport.
    pub channel: DeliveryChannel,
    /// Subject template.
    pub subject: String,
    /// Body template.
    pub body: String,
    /// Priority.
    #[serde(default)]
    pub priority: DeliveryPriority,
    /// Values for `{{name}}` placeholders.
    #[serde(default)]
    pub vars: HashMap<String, String>,
    /// Resolved address (email address, webhook URL, ...).
    #[serde(default)]
    pub address: Option<String>,
}

impl EnqueueRequest {
    /// A request with no template variables or address.
    pub fn new(
        recipient: Option<Recipient>,
        channel: DeliveryChannel,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            channel,
            subject: subject.into(),
            body: body.into(),
            priority: DeliveryPriority::default(),
            vars: HashMap::new(),
            address: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: DeliveryPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    fn validate(&self) -> AppResult<()> {
        if self.subject.trim().is_empty() {
            return Err(AppError::validation("Delivery subject must not be empty"));
        }
        if self.body.trim().is_empty() {
            return Err(AppError::validation("Delivery body must not be empty"));
        }
        if self.channel.requires_recipient() && self.recipient.is_none() {
            return Err(AppError::validation(format!(
                "Channel '{}' requires a recipient",
                self.channel
            )));
        }
        Ok(())
    }
}

/// Durable outbox over a [`DeliveryStore`].
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    store: Arc<dyn DeliveryStore>,
    hub: Arc<Hub>,
    config: DeliveryConfig,
    backoff: Backoff,
}

impl DeliveryQueue {
    /// Create a queue.
    pub fn new(store: Arc<dyn DeliveryStore>, hub: Arc<Hub>, config: DeliveryConfig) -> Self {
        let backoff = Backoff::from_config(&config);
        Self {
            store,
            hub,
            config,
            backoff,
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn DeliveryStore> {
        &self.store
    }

    /// Queue configuration.
    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Validate, render, and persist a delivery.
    ///
    /// Live items are pushed through the hub first and stored `delivered`
    /// when that succeeds, `queued` otherwise. Queued live rows are never
    /// claimed.
    pub async fn enqueue(&self, request: EnqueueRequest) -> AppResult<DeliveryId> {
        request.validate()?;

        let now = Utc::now();
        let mut item = Self::build_item(request, now);
        if item.channel.is_live() && self.push_live(&item) {
            item.state = DeliveryState::Delivered;
            item.delivered_at = Some(now);
        }

        self.persist(&item).await
    }

    /// Record the outcome of a live push made by the caller, without
    /// pushing again. `delivered == false` parks the row in `queued`.
    pub async fn record_live(
        &self,
        request: EnqueueRequest,
        delivered: bool,
    ) -> AppResult<DeliveryId> {
        if !request.channel.is_live() {
            return Err(AppError::validation(format!(
                "Channel '{}' is not live",
                request.channel
            )));
        }
        request.validate()?;

        let now = Utc::now();
        let mut item = Self::build_item(request, now);
        if delivered {
            item.state = DeliveryState::Delivered;
            item.delivered_at = Some(now);
        }

        self.persist(&item).await
    }

    /// Claim up to `limit` due items on `channels`. The live channel is
    /// never claimed.
    pub async fn claim(
        &self,
        channels: &[DeliveryChannel],
        limit: usize,
    ) -> AppResult<Vec<DeliveryItem>> {
        let drainable: Vec<DeliveryChannel> =
            channels.iter().copied().filter(|c| !c.is_live()).collect();
        if drainable.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        self.store.claim_due(&drainable, limit, Utc::now()).await
    }

    /// `sending -> delivered`.
    pub async fn mark_delivered(&self, id: DeliveryId) -> AppResult<DeliveryItem> {
        match self.store.mark_delivered(id, Utc::now()).await? {
            Some(item) => Ok(item),
            None => Err(self.transition_error(id, DeliveryState::Delivered).await),
        }
    }

    /// `sending -> failed`, then requeue with backoff or dead-letter.
    /// Returns the resulting state.
    pub async fn mark_failed(&self, id: DeliveryId, error: &str) -> AppResult<DeliveryState> {
        let now = Utc::now();
        match self.store.mark_failed(id, error, now).await? {
            Some(item) => self.resolve_failed(item, now).await,
            None => Err(self.transition_error(id, DeliveryState::Failed).await),
        }
    }

    /// Fetch an item.
    pub async fn get(&self, id: DeliveryId) -> AppResult<DeliveryItem> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Delivery {id} not found")))
    }

    /// Dead-lettered items, newest first.
    pub async fn list_dead_letters(
        &self,
        page: PageRequest,
    ) -> AppResult<PageResponse<DeliveryItem>> {
        self.store.list_by_state(DeliveryState::DeadLetter, page).await
    }

    /// Items in `state`, newest first.
    pub async fn list_by_state(
        &self,
        state: DeliveryState,
        page: PageRequest,
    ) -> AppResult<PageResponse<DeliveryItem>> {
        self.store.list_by_state(state, page).await
    }

    /// Fail `sending` rows not touched since `older_than` and resolve them
    /// like any other failure. Returns how many were recovered.
    pub async fn recover_stale(&self, older_than: DateTime<Utc>) -> AppResult<usize> {
        let now = Utc::now();
        let stale = self
            .store
            .fail_stale_sending(older_than, WORKER_LOST, now)
            .await?;
        let count = stale.len();

        for item in stale {
            let id = item.id;
            match self.resolve_failed(item, now).await {
                Ok(state) => info!(delivery_id = %id, state = %state, "Recovered stale delivery"),
                Err(e) => warn!(delivery_id = %id, error = %e, "Failed to resolve stale delivery"),
            }
        }

        Ok(count)
    }

    /// Copy a dead-lettered item into a fresh `queued` row. The original
    /// stays dead-lettered.
    pub async fn replay(&self, id: DeliveryId) -> AppResult<DeliveryItem> {
        let dead = self.get(id).await?;
        if dead.state != DeliveryState::DeadLetter {
            return Err(AppError::conflict(format!(
                "Delivery {id} is {} and cannot be replayed",
                dead.state
            )));
        }

        let item = NewDeliveryItem {
            recipient: dead.recipient,
            channel: dead.channel,
            address: dead.address,
            subject: dead.subject,
            body: dead.body,
            priority: dead.priority,
            state: DeliveryState::Queued,
        }
        .into_item(Utc::now());
        self.store.insert(&item).await?;

        info!(delivery_id = %id, replay_id = %item.id, "Dead letter replayed");
        Ok(item)
    }

    /// Delete delivered rows delivered before `before`.
    pub async fn purge_delivered(&self, before: DateTime<Utc>) -> AppResult<u64> {
        self.store.purge_delivered(before).await
    }

    fn build_item(request: EnqueueRequest, now: DateTime<Utc>) -> DeliveryItem {
        NewDeliveryItem {
            recipient: request.recipient,
            channel: request.channel,
            address: request.address.filter(|a| !a.trim().is_empty()),
            subject: template::render(&request.subject, &request.vars),
            body: template::render(&request.body, &request.vars),
            priority: request.priority,
            state: DeliveryState::Queued,
        }
        .into_item(now)
    }

    async fn persist(&self, item: &DeliveryItem) -> AppResult<DeliveryId> {
        self.store.insert(item).await?;
        debug!(
            delivery_id = %item.id,
            channel = %item.channel,
            priority = %item.priority,
            state = %item.state,
            "Delivery enqueued"
        );
        Ok(item.id)
    }

    /// Push a live item through the hub. Broadcast items count as sent if
    /// any connection accepted them.
    fn push_live(&self, item: &DeliveryItem) -> bool {
        let frame = OutboundFrame::Delivery(DeliveryPayload::from(item));
        match &item.recipient {
            Some(recipient) => self.hub.send_to(recipient, &frame).is_sent(),
            None => self.hub.broadcast_all(&frame) > 0,
        }
    }

    async fn resolve_failed(&self, item: DeliveryItem, now: DateTime<Utc>) -> AppResult<DeliveryState> {
        let resolved = if item.retry_count < self.config.max_retries {
            let delay = self.backoff.delay(item.retry_count);
            let next = chrono::Duration::from_std(delay)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.store.requeue(item.id, next, now).await?
        } else {
            warn!(
                delivery_id = %item.id,
                channel = %item.channel,
                retries = item.retry_count,
                error = item.last_error.as_deref().unwrap_or_default(),
                "Delivery moved to dead letter"
            );
            self.store.dead_letter(item.id, now).await?
        };

        match resolved {
            Some(item) => Ok(item.state),
            // Resolved concurrently; report whatever state won.
            None => Ok(self.get(item.id).await?.state),
        }
    }

    async fn transition_error(&self, id: DeliveryId, target: DeliveryState) -> AppError {
        match self.store.get(id).await {
            Ok(Some(item)) => AppError::conflict(format!(
                "Delivery {id} cannot move from {} to {target}",
                item.state
            )),
            Ok(None) => AppError::not_found(format!("Delivery {id} not found")),
            Err(e) => e,
        }
    }
}
