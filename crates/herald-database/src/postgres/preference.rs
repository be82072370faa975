use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use herald_core::Recipient;
use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_entity::preference::DeliveryPreference;

use super::{db_err, recipient_from_columns};
use crate::store::PreferenceStore;

/// PostgreSQL [`PreferenceStore`].
#[derive(Debug, Clone)]
pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    /// Create a new store on `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PreferenceRow {
    recipient_type: String,
    recipient_id: i64,
    live_enabled: bool,
    toast_enabled: bool,
    banner_enabled: bool,
    center_enabled: bool,
    email_enabled: bool,
    email_address: Option<String>,
    success_duration_secs: i32,
    info_duration_secs: i32,
    warning_duration_secs: i32,
    error_duration_secs: i32,
    security_duration_secs: i32,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PreferenceRow> for DeliveryPreference {
    type Error = AppError;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            recipient: recipient_from_columns(&row.recipient_type, row.recipient_id)?,
            live_enabled: row.live_enabled,
            toast_enabled: row.toast_enabled,
            banner_enabled: row.banner_enabled,
            center_enabled: row.center_enabled,
            email_enabled: row.email_enabled,
            email_address: row.email_address,
            success_duration_secs: row.success_duration_secs,
            info_duration_secs: row.info_duration_secs,
            warning_duration_secs: row.warning_duration_secs,
            error_duration_secs: row.error_duration_secs,
            security_duration_secs: row.security_duration_secs,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn get(&self, recipient: Recipient) -> AppResult<Option<DeliveryPreference>> {
        sqlx::query_as::<_, PreferenceRow>(
            "SELECT * FROM delivery_preferences WHERE recipient_type = $1 AND recipient_id = $2",
        )
        .bind(recipient.recipient_type().as_str())
        .bind(recipient.id())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to get preferences"))?
        .map(DeliveryPreference::try_from)
        .transpose()
    }

    async fn upsert(&self, p: &DeliveryPreference) -> AppResult<DeliveryPreference> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            "INSERT INTO delivery_preferences (recipient_type, recipient_id, live_enabled, \
             toast_enabled, banner_enabled, center_enabled, email_enabled, email_address, \
             success_duration_secs, info_duration_secs, warning_duration_secs, \
             error_duration_secs, security_duration_secs, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (recipient_type, recipient_id) DO UPDATE SET \
             live_enabled = $3, toast_enabled = $4, banner_enabled = $5, center_enabled = $6, \
             email_enabled = $7, email_address = $8, success_duration_secs = $9, \
             info_duration_secs = $10, warning_duration_secs = $11, error_duration_secs = $12, \
             security_duration_secs = $13, updated_at = $14 \
             RETURNING *",
        )
        .bind(p.recipient.recipient_type().as_str())
        .bind(p.recipient.id())
        .bind(p.live_enabled)
        .bind(p.toast_enabled)
        .bind(p.banner_enabled)
        .bind(p.center_enabled)
        .bind(p.email_enabled)
        .bind(&p.email_address)
        .bind(p.success_duration_secs)
        .bind(p.info_duration_secs)
        .bind(p.warning_duration_secs)
        .bind(p.error_duration_secs)
        .bind(p.security_duration_secs)
        .bind(p.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to upsert preferences"))?;
        row.try_into()
    }
}
