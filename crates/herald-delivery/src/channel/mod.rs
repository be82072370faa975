//! Out-of-process channel senders.
//!
//! Each drainable [`DeliveryChannel`] maps to at most one [`ChannelSender`]
//! in the [`ChannelRegistry`]. Channels without a sender are never claimed.

pub mod email;
pub mod webhook;

pub use email::SmtpSender;
pub use webhook::{WebhookFlavor, WebhookSender};

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use herald_core::AppResult;
use herald_core::config::ChannelsConfig;
use herald_entity::delivery::DeliveryChannel;

/// Why a channel send failed. Every variant goes through the retry path.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The item has no address and the channel has no default target.
    #[error("No recipient address")]
    MissingAddress,

    /// The address could not be parsed for this channel.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress {
        /// Offending address.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// No sender is registered for the channel.
    #[error("Channel '{0}' is not configured")]
    NotConfigured(DeliveryChannel),

    /// Connection or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote end answered with a non-success status.
    #[error("Rejected with status {status}: {body}")]
    Rejected {
        /// HTTP or SMTP status code.
        status: u16,
        /// Response body or message.
        body: String,
    },

    /// The send did not finish within the configured timeout.
    #[error("Timed out after {0}s")]
    Timeout(u64),
}

/// A transport for one delivery channel.
#[async_trait]
pub trait ChannelSender: Send + Sync + Debug {
    /// The channel this sender serves.
    fn channel(&self) -> DeliveryChannel;

    /// Send one rendered message. `address` is the item's resolved address.
    async fn send(&self, address: Option<&str>, subject: &str, body: &str)
    -> Result<(), SendError>;
}

/// Channel → sender table.
#[derive(Debug, Default, Clone)]
pub struct ChannelRegistry {
    senders: HashMap<DeliveryChannel, Arc<dyn ChannelSender>>,
}

impl ChannelRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build senders for every enabled channel in `config`.
    pub fn from_config(config: &ChannelsConfig) -> AppResult<Self> {
        let mut registry = Self::new();

        if config.email.is_configured() {
            registry.register(Arc::new(SmtpSender::new(&config.email)?));
        }
        for (flavor, webhook) in [
            (WebhookFlavor::Generic, &config.webhook),
            (WebhookFlavor::Slack, &config.slack),
            (WebhookFlavor::Discord, &config.discord),
        ] {
            if webhook.enabled {
                registry.register(Arc::new(WebhookSender::new(flavor, webhook.clone())));
            }
        }

        Ok(registry)
    }

    /// Register `sender`, replacing any sender for the same channel. Live
    /// senders are ignored; the hub owns that channel.
    pub fn register(&mut self, sender: Arc<dyn ChannelSender>) {
        let channel = sender.channel();
        if channel.is_live() {
            return;
        }
        info!(channel = %channel, "Registered channel sender");
        self.senders.insert(channel, sender);
    }

    /// Sender for `channel`.
    pub fn get(&self, channel: DeliveryChannel) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&channel).cloned()
    }

    /// Whether `channel` has a sender.
    pub fn contains(&self, channel: DeliveryChannel) -> bool {
        self.senders.contains_key(&channel)
    }

    /// Channels with a sender, in declaration order.
    pub fn channels(&self) -> Vec<DeliveryChannel> {
        DeliveryChannel::ALL
            .iter()
            .copied()
            .filter(|c| self.senders.contains_key(c))
            .collect()
    }
}
