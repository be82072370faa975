//! Webhook senders: generic JSON, Slack, and Discord.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::json;
use tracing::{debug, warn};

use herald_core::config::{WebhookAuth, WebhookConfig};
use herald_entity::delivery::DeliveryChannel;

use super::{ChannelSender, SendError};

/// Discord rejects `content` longer than this.
const DISCORD_CONTENT_LIMIT: usize = 2000;

/// Payload shape expected by the receiving end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookFlavor {
    /// `{"subject", "body", "address", "timestamp"}`.
    Generic,
    /// Slack incoming webhook `{"text"}`.
    Slack,
    /// Discord webhook `{"content"}`.
    Discord,
}

impl WebhookFlavor {
    /// The delivery channel served by this flavor.
    pub fn channel(&self) -> DeliveryChannel {
        match self {
            Self::Generic => DeliveryChannel::Webhook,
            Self::Slack => DeliveryChannel::Slack,
            Self::Discord => DeliveryChannel::Discord,
        }
    }
}

/// HTTP POST sender for a webhook-style channel.
#[derive(Debug)]
pub struct WebhookSender {
    flavor: WebhookFlavor,
    config: WebhookConfig,
    client: Client,
}

impl WebhookSender {
    /// Create a sender for `flavor`.
    pub fn new(flavor: WebhookFlavor, config: WebhookConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            flavor,
            config,
            client,
        }
    }

    /// Target URL: the item's address if set, otherwise the configured URL.
    fn target<'a>(&'a self, address: Option<&'a str>) -> Result<&'a str, SendError> {
        address
            .filter(|a| !a.trim().is_empty())
            .or_else(|| Some(self.config.url.as_str()).filter(|u| !u.is_empty()))
            .ok_or(SendError::MissingAddress)
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.config.headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<HeaderName>(),
                value.parse::<HeaderValue>(),
            ) {
                headers.insert(name, value);
            }
        }

        match &self.config.auth {
            Some(WebhookAuth::Bearer { token }) => {
                if let Ok(value) = format!("Bearer {token}").parse() {
                    headers.insert(AUTHORIZATION, value);
                }
            }
            Some(WebhookAuth::Header { name, value }) => {
                if let (Ok(name), Ok(value)) = (
                    name.parse::<HeaderName>(),
                    value.parse::<HeaderValue>(),
                ) {
                    headers.insert(name, value);
                }
            }
            // Applied on the request builder.
            Some(WebhookAuth::Basic { .. }) | None => {}
        }

        headers
    }

    fn build_payload(&self, address: Option<&str>, subject: &str, body: &str) -> serde_json::Value {
        match self.flavor {
            WebhookFlavor::Generic => json!({
                "subject": subject,
                "body": body,
                "address": address,
                "timestamp": Utc::now().to_rfc3339(),
            }),
            WebhookFlavor::Slack => json!({
                "text": format!("*{subject}*\n{body}"),
            }),
            WebhookFlavor::Discord => {
                let content: String = format!("**{subject}**\n{body}")
                    .chars()
                    .take(DISCORD_CONTENT_LIMIT)
                    .collect();
                json!({ "content": content })
            }
        }
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    fn channel(&self) -> DeliveryChannel {
        self.flavor.channel()
    }

    async fn send(
        &self,
        address: Option<&str>,
        subject: &str,
        body: &str,
    ) -> Result<(), SendError> {
        let url = self.target(address)?;
        let payload = self.build_payload(address, subject, body);

        let mut request = self
            .client
            .post(url)
            .headers(self.build_headers())
            .json(&payload);

        if let Some(WebhookAuth::Basic { username, password }) = &self.config.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(channel = %self.channel(), status = %status, "Webhook rejected");
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(channel = %self.channel(), "Webhook sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(flavor: WebhookFlavor, config: WebhookConfig) -> WebhookSender {
        WebhookSender::new(flavor, config)
    }

    #[test]
    fn test_build_headers_with_bearer() {
        let webhook = sender(
            WebhookFlavor::Generic,
            WebhookConfig {
                enabled: true,
                url: "https://example.com/hook".to_string(),
                auth: Some(WebhookAuth::Bearer {
                    token: "test-token".to_string(),
                }),
                ..Default::default()
            },
        );
        let headers = webhook.build_headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer test-token");
    }

    #[test]
    fn test_custom_headers_skip_invalid_names() {
        let mut config = WebhookConfig::default();
        config
            .headers
            .insert("x-source".to_string(), "herald".to_string());
        config
            .headers
            .insert("bad header".to_string(), "x".to_string());
        let headers = sender(WebhookFlavor::Generic, config).build_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-source"], "herald");
    }

    #[test]
    fn test_payload_flavors() {
        let slack = sender(WebhookFlavor::Slack, WebhookConfig::default());
        assert_eq!(
            slack.build_payload(None, "Deploy", "done")["text"],
            "*Deploy*\ndone"
        );

        let discord = sender(WebhookFlavor::Discord, WebhookConfig::default());
        let long = "x".repeat(3000);
        let payload = discord.build_payload(None, "S", &long);
        assert_eq!(
            payload["content"].as_str().unwrap().chars().count(),
            DISCORD_CONTENT_LIMIT
        );

        let generic = sender(WebhookFlavor::Generic, WebhookConfig::default());
        let payload = generic.build_payload(Some("ops"), "S", "B");
        assert_eq!(payload["subject"], "S");
        assert_eq!(payload["address"], "ops");
    }

    #[tokio::test]
    async fn test_missing_target() {
        let webhook = sender(WebhookFlavor::Generic, WebhookConfig::default());
        assert!(matches!(
            webhook.send(None, "s", "b").await,
            Err(SendError::MissingAddress)
        ));
        assert_eq!(webhook.channel(), DeliveryChannel::Webhook);
    }
}
