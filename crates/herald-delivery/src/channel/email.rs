//! SMTP email sender.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

use herald_core::AppResult;
use herald_core::config::EmailConfig;
use herald_core::error::{AppError, ErrorKind};
use herald_entity::delivery::DeliveryChannel;

use super::{ChannelSender, SendError};

/// Sends plain-text email through an SMTP relay.
#[derive(Debug)]
pub struct SmtpSender {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let from: Mailbox = config.from_address.parse().map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid email from_address '{}'", config.from_address),
                e,
            )
        })?;

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host).map_err(
                |e| AppError::with_source(ErrorKind::Configuration, "Invalid SMTP relay", e),
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    /// Build the message for `address`.
    fn build_message(&self, address: &str, subject: &str, body: &str) -> Result<Message, SendError> {
        let to: Mailbox = address.parse().map_err(|e| SendError::InvalidAddress {
            address: address.to_string(),
            reason: format!("{e}"),
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SendError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ChannelSender for SmtpSender {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Email
    }

    async fn send(
        &self,
        address: Option<&str>,
        subject: &str,
        body: &str,
    ) -> Result<(), SendError> {
        let address = address
            .filter(|a| !a.trim().is_empty())
            .ok_or(SendError::MissingAddress)?;
        let message = self.build_message(address, subject, body)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        debug!(to = %address, "Email sent");
        Ok(())
    }
}
