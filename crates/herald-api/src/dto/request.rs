//! Request DTOs with validation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use herald_core::Recipient;
use herald_delivery::EnqueueRequest;
use herald_entity::delivery::{DeliveryChannel, DeliveryPriority};
use herald_entity::notification::{DisplayMode, NotificationAction, NotificationKind};
use herald_service::{NotifyRequest, PreferenceUpdate};

/// Producer event body for `POST /api/notify`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NotifyBody {
    /// Target recipient.
    pub recipient: Recipient,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Rendering hint.
    #[serde(default = "default_display_mode")]
    pub display_mode: DisplayMode,
    /// Title.
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    /// Body.
    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,
    /// Optional call-to-action.
    #[serde(default)]
    pub action: Option<NotificationAction>,
}

fn default_display_mode() -> DisplayMode {
    DisplayMode::Toast
}

impl From<NotifyBody> for NotifyRequest {
    fn from(body: NotifyBody) -> Self {
        NotifyRequest {
            recipient: body.recipient,
            kind: body.kind,
            display_mode: body.display_mode,
            title: body.title,
            body: body.body,
            action: body.action,
        }
    }
}

/// Body for `POST /api/delivery`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EnqueueBody {
    /// Target recipient; omitted for broadcasts.
    #[serde(default)]
    pub recipient: Option<Recipient>,
    /// Transport.
    pub channel: DeliveryChannel,
    /// Subject template.
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    /// Body template.
    #[validate(length(min = 1))]
    pub body: String,
    /// Queue priority.
    #[serde(default)]
    pub priority: DeliveryPriority,
    /// `{{name}}` substitutions.
    #[serde(default)]
    pub vars: HashMap<String, String>,
    /// Channel-specific address override.
    #[validate(length(min = 1, max = 2048))]
    pub address: Option<String>,
}

impl From<EnqueueBody> for EnqueueRequest {
    fn from(body: EnqueueBody) -> Self {
        let mut request = EnqueueRequest::new(body.recipient, body.channel, body.subject, body.body)
            .with_priority(body.priority);
        request.vars = body.vars;
        if let Some(address) = body.address {
            request = request.with_address(address);
        }
        request
    }
}

/// Body for `PUT /api/preferences`. Omitted fields keep their value; an
/// empty `email_address` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePreferencesBody {
    pub live_enabled: Option<bool>,
    pub toast_enabled: Option<bool>,
    pub banner_enabled: Option<bool>,
    pub center_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    #[validate(length(max = 320))]
    pub email_address: Option<String>,
    #[validate(range(min = 0))]
    pub success_duration_secs: Option<i32>,
    #[validate(range(min = 0))]
    pub info_duration_secs: Option<i32>,
    #[validate(range(min = 0))]
    pub warning_duration_secs: Option<i32>,
    #[validate(range(min = 0))]
    pub error_duration_secs: Option<i32>,
    #[validate(range(min = 0))]
    pub security_duration_secs: Option<i32>,
}

impl From<UpdatePreferencesBody> for PreferenceUpdate {
    fn from(body: UpdatePreferencesBody) -> Self {
        PreferenceUpdate {
            live_enabled: body.live_enabled,
            toast_enabled: body.toast_enabled,
            banner_enabled: body.banner_enabled,
            center_enabled: body.center_enabled,
            email_enabled: body.email_enabled,
            email_address: body.email_address,
            success_duration_secs: body.success_duration_secs,
            info_duration_secs: body.info_duration_secs,
            warning_duration_secs: body.warning_duration_secs,
            error_duration_secs: body.error_duration_secs,
            security_duration_secs: body.security_duration_secs,
        }
    }
}
