use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::types::{DeliveryId, PageRequest, PageResponse};
use herald_entity::delivery::{DeliveryChannel, DeliveryItem, DeliveryPriority, DeliveryState};

use super::{db_err, parse_column, recipient_from_columns};
use crate::store::{DeliveryAggregate, DeliveryStore};

/// PostgreSQL [`DeliveryStore`].
///
/// Every state change is an `UPDATE ... WHERE state = <expected>`, so two
/// workers can never both move the same row.
#[derive(Debug, Clone)]
pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    /// Create a new store on `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_opt(
        &self,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, DeliveryRow, sqlx::postgres::PgArguments>,
        context: &'static str,
    ) -> AppResult<Option<DeliveryItem>> {
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err(context))?
            .map(DeliveryItem::try_from)
            .transpose()
    }
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    id: Uuid,
    recipient_type: Option<String>,
    recipient_id: Option<i64>,
    channel: String,
    address: Option<String>,
    subject: String,
    body: String,
    priority: i16,
    state: String,
    retry_count: i32,
    last_error: Option<String>,
    next_attempt_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
}

impl TryFrom<DeliveryRow> for DeliveryItem {
    type Error = AppError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        let recipient = match (row.recipient_type.as_deref(), row.recipient_id) {
            (Some(kind), Some(id)) => Some(recipient_from_columns(kind, id)?),
            _ => None,
        };
        let priority = DeliveryPriority::from_rank(row.priority).ok_or_else(|| {
            AppError::database(format!("Corrupt priority column: {}", row.priority))
        })?;
        Ok(Self {
            id: DeliveryId::from_uuid(row.id),
            recipient,
            channel: parse_column(&row.channel, "channel")?,
            address: row.address,
            subject: row.subject,
            body: row.body,
            priority,
            state: parse_column(&row.state, "state")?,
            retry_count: row.retry_count,
            last_error: row.last_error,
            next_attempt_at: row.next_attempt_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            delivered_at: row.delivered_at,
        })
    }
}

fn into_items(rows: Vec<DeliveryRow>) -> AppResult<Vec<DeliveryItem>> {
    rows.into_iter().map(DeliveryItem::try_from).collect()
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn insert(&self, item: &DeliveryItem) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO delivery_queue (id, recipient_type, recipient_id, channel, address, \
             subject, body, priority, state, retry_count, last_error, next_attempt_at, \
             created_at, updated_at, delivered_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(item.id.into_uuid())
        .bind(item.recipient.map(|r| r.recipient_type().as_str()))
        .bind(item.recipient.map(|r| r.id()))
        .bind(item.channel.as_str())
        .bind(&item.address)
        .bind(&item.subject)
        .bind(&item.body)
        .bind(item.priority.rank())
        .bind(item.state.as_str())
        .bind(item.retry_count)
        .bind(&item.last_error)
        .bind(item.next_attempt_at)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.delivered_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert delivery item"))?;
        Ok(())
    }

    async fn get(&self, id: DeliveryId) -> AppResult<Option<DeliveryItem>> {
        self.fetch_one_opt(
            sqlx::query_as("SELECT * FROM delivery_queue WHERE id = $1").bind(id.into_uuid()),
            "Failed to find delivery item",
        )
        .await
    }

    async fn claim_due(
        &self,
        channels: &[DeliveryChannel],
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DeliveryItem>> {
        if channels.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let names: Vec<String> = channels.iter().map(|c| c.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, DeliveryRow>(
            "UPDATE delivery_queue SET state = 'sending', updated_at = $3 \
             WHERE id IN ( \
                SELECT id FROM delivery_queue \
                WHERE state = 'queued' AND channel = ANY($1) AND next_attempt_at <= $3 \
                ORDER BY priority DESC, created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT $2 \
             ) AND state = 'queued' RETURNING *",
        )
        .bind(&names)
        .bind(limit as i64)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to claim delivery items"))?;

        let mut items = into_items(rows)?;
        items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(items)
    }

    async fn mark_delivered(
        &self,
        id: DeliveryId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        self.fetch_one_opt(
            sqlx::query_as(
                "UPDATE delivery_queue SET state = 'delivered', delivered_at = $2, updated_at = $2 \
                 WHERE id = $1 AND state = 'sending' RETURNING *",
            )
            .bind(id.into_uuid())
            .bind(now),
            "Failed to mark delivered",
        )
        .await
    }

    async fn mark_failed(
        &self,
        id: DeliveryId,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        self.fetch_one_opt(
            sqlx::query_as(
                "UPDATE delivery_queue SET state = 'failed', retry_count = retry_count + 1, \
                 last_error = $2, updated_at = $3 \
                 WHERE id = $1 AND state = 'sending' RETURNING *",
            )
            .bind(id.into_uuid())
            .bind(error)
            .bind(now),
            "Failed to mark failed",
        )
        .await
    }

    async fn requeue(
        &self,
        id: DeliveryId,
        next_attempt_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        self.fetch_one_opt(
            sqlx::query_as(
                "UPDATE delivery_queue SET state = 'queued', next_attempt_at = $2, updated_at = $3 \
                 WHERE id = $1 AND state = 'failed' RETURNING *",
            )
            .bind(id.into_uuid())
            .bind(next_attempt_at)
            .bind(now),
            "Failed to requeue delivery item",
        )
        .await
    }

    async fn dead_letter(
        &self,
        id: DeliveryId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DeliveryItem>> {
        self.fetch_one_opt(
            sqlx::query_as(
                "UPDATE delivery_queue SET state = 'dead_letter', updated_at = $2 \
                 WHERE id = $1 AND state = 'failed' RETURNING *",
            )
            .bind(id.into_uuid())
            .bind(now),
            "Failed to dead-letter delivery item",
        )
        .await
    }

    async fn fail_stale_sending(
        &self,
        older_than: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DeliveryItem>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            "UPDATE delivery_queue SET state = 'failed', retry_count = retry_count + 1, \
             last_error = $2, updated_at = $3 \
             WHERE state = 'sending' AND updated_at < $1 RETURNING *",
        )
        .bind(older_than)
        .bind(error)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to recover stale deliveries"))?;
        into_items(rows)
    }

    async fn list_by_state(
        &self,
        state: DeliveryState,
        page: PageRequest,
    ) -> AppResult<PageResponse<DeliveryItem>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM delivery_queue WHERE state = $1")
            .bind(state.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count delivery items"))?;

        let rows = sqlx::query_as::<_, DeliveryRow>(
            "SELECT * FROM delivery_queue WHERE state = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(state.as_str())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list delivery items"))?;

        Ok(PageResponse::new(into_items(rows)?, page, total as u64))
    }

    async fn purge_delivered(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM delivery_queue WHERE state = 'delivered' AND delivered_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to purge delivered items"))?;
        Ok(result.rows_affected())
    }

    async fn aggregate(&self, since: Option<DateTime<Utc>>) -> AppResult<DeliveryAggregate> {
        let groups: Vec<(String, String, i16, i64)> = sqlx::query_as(
            "SELECT state, channel, priority, COUNT(*) FROM delivery_queue \
             WHERE ($1::timestamptz IS NULL OR created_at >= $1) \
             GROUP BY state, channel, priority",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to aggregate delivery queue"))?;

        let avg_latency_ms: Option<f64> = sqlx::query_scalar(
            "SELECT (AVG(EXTRACT(EPOCH FROM (delivered_at - created_at))) * 1000)::float8 \
             FROM delivery_queue \
             WHERE state = 'delivered' AND delivered_at IS NOT NULL \
             AND ($1::timestamptz IS NULL OR created_at >= $1)",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to compute delivery latency"))?;

        let mut agg = DeliveryAggregate {
            avg_latency_ms,
            ..Default::default()
        };
        for (state, channel, priority, count) in groups {
            let count = count as u64;
            let state: DeliveryState = parse_column(&state, "state")?;
            agg.by_state.add(state, count);
            if channel == DeliveryChannel::Live.as_str() && state == DeliveryState::Queued {
                agg.live_queued += count;
            }
            *agg.by_channel.entry(channel).or_default() += count;
            let priority = DeliveryPriority::from_rank(priority)
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| priority.to_string());
            *agg.by_priority.entry(priority).or_default() += count;
        }
        Ok(agg)
    }

    async fn count_overdue(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_queue \
             WHERE state = 'queued' AND channel <> 'live' AND next_attempt_at < $1",
        )
        .bind(before)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count overdue deliveries"))?;
        Ok(count as u64)
    }
}
