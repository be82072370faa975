//! PostgreSQL stores.
//!
//! Rows are read into flat `FromRow` structs and converted into the typed
//! entities; string columns that fail to parse surface as database errors.

mod delivery;
mod notification;
mod preference;

pub use delivery::PgDeliveryStore;
pub use notification::PgNotificationStore;
pub use preference::PgPreferenceStore;

use herald_core::Recipient;
use herald_core::error::{AppError, ErrorKind};

/// Wrap a sqlx error the way every repository method does.
fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

/// Rebuild a recipient from its persisted columns.
fn recipient_from_columns(recipient_type: &str, recipient_id: i64) -> Result<Recipient, AppError> {
    Recipient::from_parts(recipient_type, recipient_id)
        .map_err(|e| AppError::database(format!("Corrupt recipient column: {}", e.message)))
}

/// Rebuild an enum from a persisted text column.
fn parse_column<T>(value: &str, column: &str) -> Result<T, AppError>
where
    T: std::str::FromStr<Err = AppError>,
{
    value
        .parse()
        .map_err(|e: AppError| AppError::database(format!("Corrupt {column} column: {}", e.message)))
}
