//! Delivery channel enumeration.

use std::fmt;
use std::str::FromStr;

use herald_core::AppError;
use serde::{Deserialize, Serialize};

/// A transport a delivery item is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    /// In-process push over an open connection.
    Live,
    /// Transactional email.
    Email,
    /// SMS.
    Sms,
    /// Mobile push provider.
    Push,
    /// Generic HTTP webhook.
    Webhook,
    /// Slack incoming webhook.
    Slack,
    /// Discord webhook.
    Discord,
}

impl DeliveryChannel {
    /// All channels, in declaration order.
    pub const ALL: [DeliveryChannel; 7] = [
        Self::Live,
        Self::Email,
        Self::Sms,
        Self::Push,
        Self::Webhook,
        Self::Slack,
        Self::Discord,
    ];

    /// Whether this is the in-process live channel.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Whether items on this channel must name a recipient. Live items
    /// without one are broadcast.
    pub fn requires_recipient(&self) -> bool {
        matches!(self, Self::Email)
    }

    /// Return the channel as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
            Self::Webhook => "webhook",
            Self::Slack => "slack",
            Self::Discord => "discord",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryChannel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown delivery channel: '{s}'")))
    }
}
