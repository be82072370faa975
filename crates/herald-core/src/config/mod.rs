//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every section has defaults, so an empty configuration yields a
//! runnable in-memory server.

pub mod app;
pub mod channels;
pub mod database;
pub mod delivery;
pub mod logging;
pub mod notification;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::channels::{ChannelsConfig, EmailConfig, WebhookAuth, WebhookConfig};
pub use self::database::DatabaseConfig;
pub use self::delivery::{DeliveryConfig, HealthThresholds};
pub use self::logging::LoggingConfig;
pub use self::notification::NotificationConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Persistence settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Connection hub settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Inbox retention settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Delivery queue settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Out-of-band channel transports.
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `HERALD__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HERALD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        app.validate()?;
        Ok(app)
    }

    /// Reject settings that would make a subsystem unusable.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.realtime.outbound_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.outbound_buffer_size must be greater than zero",
            ));
        }
        if self.realtime.ping_interval_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.ping_interval_seconds must be greater than zero",
            ));
        }
        if self.notifications.max_per_recipient == 0 {
            return Err(AppError::configuration(
                "notifications.max_per_recipient must be greater than zero",
            ));
        }
        if self.delivery.retry_base_delay_seconds > self.delivery.retry_max_delay_seconds {
            return Err(AppError::configuration(
                "delivery.retry_base_delay_seconds must not exceed retry_max_delay_seconds",
            ));
        }
        match self.database.provider.as_str() {
            "postgres" | "memory" => Ok(()),
            other => Err(AppError::configuration(format!(
                "Unknown database provider: '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.notifications.max_per_recipient, 100);
        assert_eq!(config.realtime.outbound_buffer_size, 256);
        assert_eq!(config.delivery.retry_base_delay_seconds, 30);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = AppConfig::default();
        config.database.provider = "sqlite".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[notifications]\nmax_per_recipient = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.notifications.max_per_recipient, 5);
        assert_eq!(config.notifications.default_ttl_days, 30);
        assert_eq!(config.realtime.heartbeat_timeout_seconds, 120);
    }
}
