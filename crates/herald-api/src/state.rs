//! Application state shared across all handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use herald_core::config::AppConfig;
use herald_database::StoreManager;
use herald_delivery::{ChannelRegistry, DeliveryMetricsCollector, DeliveryQueue};
use herald_realtime::Hub;
use herald_entity::delivery::DeliveryChannel;
use herald_service::{NotificationService, Notifier, PreferenceService, RetentionQueue};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Persistence backends
    pub stores: Arc<StoreManager>,
    /// Live connection hub
    pub hub: Arc<Hub>,
    /// Registered out-of-band channels
    pub channels: Arc<ChannelRegistry>,
    /// Delivery queue
    pub queue: Arc<DeliveryQueue>,
    /// Inbox service
    pub notifications: Arc<NotificationService>,
    /// Preference service
    pub preferences: Arc<PreferenceService>,
    /// Producer entry point
    pub notifier: Arc<Notifier>,
    /// Delivery metrics and health
    pub delivery_metrics: Arc<DeliveryMetricsCollector>,
    /// Process start time, for uptime reporting
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the services on top of the stores, the hub, and the channel
    /// registry.
    pub fn new(
        config: Arc<AppConfig>,
        stores: Arc<StoreManager>,
        hub: Arc<Hub>,
        channels: Arc<ChannelRegistry>,
        retention: RetentionQueue,
    ) -> Self {
        let queue = Arc::new(DeliveryQueue::new(
            stores.deliveries(),
            Arc::clone(&hub),
            config.delivery.clone(),
        ));
        let notifications = Arc::new(NotificationService::new(
            stores.notifications(),
            retention,
            config.notifications.clone(),
        ));
        let preferences = Arc::new(PreferenceService::new(stores.preferences()));
        let notifier = Arc::new(Notifier::new(
            Arc::clone(&notifications),
            Arc::clone(&preferences),
            Arc::clone(&hub),
            Arc::clone(&queue),
            channels.contains(DeliveryChannel::Email),
        ));
        let delivery_metrics = Arc::new(DeliveryMetricsCollector::new(
            stores.deliveries(),
            config.delivery.health.clone(),
        ));

        Self {
            config,
            stores,
            hub,
            channels,
            queue,
            notifications,
            preferences,
            notifier,
            delivery_metrics,
            started_at: Utc::now(),
        }
    }

    /// Seconds since the process started.
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}
