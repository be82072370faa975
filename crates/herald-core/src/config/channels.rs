//! Out-of-band channel transport configuration.
//!
//! A channel whose section is disabled has no sender registered, so its
//! queued items are never claimed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Transport settings for every out-of-band channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// SMTP email transport.
    #[serde(default)]
    pub email: EmailConfig,
    /// Generic JSON webhook.
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Slack incoming webhook.
    #[serde(default)]
    pub slack: WebhookConfig,
    /// Discord webhook.
    #[serde(default)]
    pub discord: WebhookConfig,
}

/// SMTP email transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Whether the email channel is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP server host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Use STARTTLS. Disable only for local relays.
    #[serde(default = "default_true")]
    pub use_tls: bool,
    /// Sender mailbox, e.g. `Herald <noreply@example.com>`.
    #[serde(default)]
    pub from_address: String,
    /// SMTP command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl EmailConfig {
    /// Whether the transport has enough settings to send mail.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.smtp_host.is_empty() && !self.from_address.is_empty()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            use_tls: true,
            from_address: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Webhook-style channel configuration (generic, Slack, Discord).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Whether the channel is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Default target URL. An item's own address takes precedence.
    #[serde(default)]
    pub url: String,
    /// Extra request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Authentication scheme.
    #[serde(default)]
    pub auth: Option<WebhookAuth>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            headers: HashMap::new(),
            auth: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Webhook authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookAuth {
    /// Bearer token authentication.
    Bearer { token: String },
    /// Basic authentication.
    Basic { username: String, password: String },
    /// Custom header authentication.
    Header { name: String, value: String },
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_requires_sender_address() {
        let mut config = EmailConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(!config.is_configured());
        config.from_address = "noreply@example.com".to_string();
        assert!(config.is_configured());
    }

    #[test]
    fn test_channels_disabled_by_default() {
        let config = ChannelsConfig::default();
        assert!(!config.email.enabled);
        assert!(!config.webhook.enabled);
        assert!(!config.slack.enabled);
        assert!(!config.discord.enabled);
    }
}
