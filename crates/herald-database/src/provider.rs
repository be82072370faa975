//! Store manager that dispatches to the configured provider.

use std::sync::Arc;

use tracing::info;

use herald_core::config::DatabaseConfig;
use herald_core::error::AppError;
use herald_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::{MemoryDeliveryStore, MemoryNotificationStore, MemoryPreferenceStore};
use crate::postgres::{PgDeliveryStore, PgNotificationStore, PgPreferenceStore};
use crate::store::{DeliveryStore, NotificationStore, PreferenceStore};

/// Holds one implementation of every store trait.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    notifications: Arc<dyn NotificationStore>,
    deliveries: Arc<dyn DeliveryStore>,
    preferences: Arc<dyn PreferenceStore>,
    pool: Option<DatabasePool>,
}

impl StoreManager {
    /// Create the stores for `config.provider`.
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider.as_str() {
            "postgres" => {
                info!("Initializing PostgreSQL store provider");
                let pool = DatabasePool::open(config).await?;
                Ok(Self {
                    notifications: Arc::new(PgNotificationStore::new(pool.pool().clone())),
                    deliveries: Arc::new(PgDeliveryStore::new(pool.pool().clone())),
                    preferences: Arc::new(PgPreferenceStore::new(pool.pool().clone())),
                    pool: Some(pool),
                })
            }
            "memory" => {
                info!("Initializing in-memory store provider");
                Ok(Self::memory())
            }
            other => Err(AppError::configuration(format!(
                "Unknown database provider: '{other}'. Supported: postgres, memory"
            ))),
        }
    }

    /// Fresh in-memory stores.
    pub fn memory() -> Self {
        Self {
            notifications: Arc::new(MemoryNotificationStore::new()),
            deliveries: Arc::new(MemoryDeliveryStore::new()),
            preferences: Arc::new(MemoryPreferenceStore::new()),
            pool: None,
        }
    }

    /// Build a manager from existing stores (for testing).
    pub fn from_stores(
        notifications: Arc<dyn NotificationStore>,
        deliveries: Arc<dyn DeliveryStore>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            notifications,
            deliveries,
            preferences,
            pool: None,
        }
    }

    /// Notification store.
    pub fn notifications(&self) -> Arc<dyn NotificationStore> {
        Arc::clone(&self.notifications)
    }

    /// Delivery queue store.
    pub fn deliveries(&self) -> Arc<dyn DeliveryStore> {
        Arc::clone(&self.deliveries)
    }

    /// Preference store.
    pub fn preferences(&self) -> Arc<dyn PreferenceStore> {
        Arc::clone(&self.preferences)
    }

    /// Name of the active provider.
    pub fn provider_name(&self) -> &'static str {
        if self.pool.is_some() { "postgres" } else { "memory" }
    }

    /// Check backend connectivity. Always healthy for the memory provider.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.pool {
            Some(pool) => pool.health_check().await,
            None => Ok(true),
        }
    }

    /// Release backend resources.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
