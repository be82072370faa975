use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use herald_core::Recipient;
use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::types::{NotificationId, PageRequest, PageResponse};
use herald_entity::notification::{Notification, NotificationAction, NotificationStats};

use super::{db_err, parse_column, recipient_from_columns};
use crate::store::NotificationStore;

/// Visible in listings: not dismissed and not expired.
const LISTED: &str = "recipient_type = $1 AND recipient_id = $2 AND is_dismissed = FALSE AND expires_at > $3";
/// Counted as unread.
const UNREAD: &str = "recipient_type = $1 AND recipient_id = $2 AND is_dismissed = FALSE AND is_read = FALSE AND expires_at > $3";

/// PostgreSQL [`NotificationStore`].
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    /// Create a new store on `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn page(
        &self,
        filter: &str,
        recipient: Recipient,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notifications WHERE {filter}"
        ))
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count notifications"))?;

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT * FROM notifications WHERE {filter} \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .bind(now)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list notifications"))?;

        let items = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PageResponse::new(items, page, total as u64))
    }

    /// Run an owned-row update and map "no row" to `NotFound`.
    async fn owned_update(
        &self,
        sql: &str,
        id: NotificationId,
        recipient: Recipient,
        now: Option<DateTime<Utc>>,
        context: &'static str,
    ) -> AppResult<()> {
        let mut query = sqlx::query(sql)
            .bind(id.into_uuid())
            .bind(recipient.recipient_type().as_str())
            .bind(recipient.id());
        if let Some(now) = now {
            query = query.bind(now);
        }
        let result = query.execute(&self.pool).await.map_err(db_err(context))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Notification {id} not found")));
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_type: String,
    recipient_id: i64,
    kind: String,
    display_mode: String,
    title: String,
    body: String,
    action: Option<sqlx::types::Json<NotificationAction>>,
    is_read: bool,
    is_dismissed: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NotificationId::from_uuid(row.id),
            recipient: recipient_from_columns(&row.recipient_type, row.recipient_id)?,
            kind: parse_column(&row.kind, "kind")?,
            display_mode: parse_column(&row.display_mode, "display_mode")?,
            title: row.title,
            body: row.body,
            action: row.action.map(|a| a.0),
            read: row.is_read,
            dismissed: row.is_dismissed,
            read_at: row.read_at,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, n: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, recipient_type, recipient_id, kind, display_mode, \
             title, body, action, is_read, is_dismissed, read_at, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(n.id.into_uuid())
        .bind(n.recipient.recipient_type().as_str())
        .bind(n.recipient.id())
        .bind(n.kind.as_str())
        .bind(n.display_mode.as_str())
        .bind(&n.title)
        .bind(&n.body)
        .bind(n.action.as_ref().map(sqlx::types::Json))
        .bind(n.read)
        .bind(n.dismissed)
        .bind(n.read_at)
        .bind(n.created_at)
        .bind(n.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to create notification"))?;
        Ok(())
    }

    async fn get_by_id(
        &self,
        id: NotificationId,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications \
             WHERE id = $1 AND recipient_type = $2 AND recipient_id = $3 AND expires_at > $4",
        )
        .bind(id.into_uuid())
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find notification"))?
        .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
        row.try_into()
    }

    async fn list_by_recipient(
        &self,
        recipient: Recipient,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>> {
        self.page(LISTED, recipient, page, now).await
    }

    async fn list_unread(
        &self,
        recipient: Recipient,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>> {
        self.page(UNREAD, recipient, page, now).await
    }

    async fn unread_count(&self, recipient: Recipient, now: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notifications WHERE {UNREAD}"
        ))
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count unread"))?;
        Ok(count as u64)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.owned_update(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, $4) \
             WHERE id = $1 AND recipient_type = $2 AND recipient_id = $3",
            id,
            recipient,
            Some(now),
            "Failed to mark read",
        )
        .await
    }

    async fn mark_all_read(&self, recipient: Recipient, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $3 \
             WHERE recipient_type = $1 AND recipient_id = $2 AND is_read = FALSE AND expires_at > $3",
        )
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark all read"))?;
        Ok(result.rows_affected())
    }

    async fn dismiss(&self, id: NotificationId, recipient: Recipient) -> AppResult<()> {
        self.owned_update(
            "UPDATE notifications SET is_dismissed = TRUE \
             WHERE id = $1 AND recipient_type = $2 AND recipient_id = $3",
            id,
            recipient,
            None,
            "Failed to dismiss notification",
        )
        .await
    }

    async fn delete(&self, id: NotificationId, recipient: Recipient) -> AppResult<()> {
        self.owned_update(
            "DELETE FROM notifications WHERE id = $1 AND recipient_type = $2 AND recipient_id = $3",
            id,
            recipient,
            None,
            "Failed to delete notification",
        )
        .await
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to cleanup notifications"))?;
        Ok(result.rows_affected())
    }

    async fn enforce_limit(
        &self,
        recipient: Recipient,
        cap: u64,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE id IN (\
                SELECT id FROM (\
                    SELECT id, ROW_NUMBER() OVER (ORDER BY created_at DESC, id DESC) AS r_num \
                    FROM notifications \
                    WHERE recipient_type = $1 AND recipient_id = $2 AND expires_at > $3\
                ) t WHERE t.r_num > $4\
             )",
        )
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .bind(now)
        .bind(cap as i64)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to enforce notification limit"))?;
        Ok(result.rows_affected())
    }

    async fn enforce_limit_all(&self, cap: u64, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE id IN (\
                SELECT id FROM (\
                    SELECT id, ROW_NUMBER() OVER (\
                        PARTITION BY recipient_type, recipient_id \
                        ORDER BY created_at DESC, id DESC\
                    ) AS r_num \
                    FROM notifications WHERE expires_at > $1\
                ) t WHERE t.r_num > $2\
             )",
        )
        .bind(now)
        .bind(cap as i64)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to trim notifications"))?;
        Ok(result.rows_affected())
    }

    async fn statistics(
        &self,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationStats> {
        let rows: Vec<(String, String, bool, bool, i64)> = sqlx::query_as(
            "SELECT kind, display_mode, is_read, is_dismissed, COUNT(*) FROM notifications \
             WHERE recipient_type = $1 AND recipient_id = $2 AND expires_at > $3 \
             GROUP BY kind, display_mode, is_read, is_dismissed",
        )
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to compute notification statistics"))?;

        let mut stats = NotificationStats::default();
        for (kind, display_mode, is_read, is_dismissed, count) in rows {
            let count = count as u64;
            stats.total += count;
            if is_read {
                stats.read += count;
            } else {
                stats.unread += count;
            }
            if is_dismissed {
                stats.dismissed += count;
            }
            *stats.by_kind.entry(kind).or_default() += count;
            *stats.by_display_mode.entry(display_mode).or_default() += count;
        }
        Ok(stats)
    }
}
