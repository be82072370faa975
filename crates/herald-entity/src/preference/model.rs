//! Delivery preference entity.

use chrono::{DateTime, Utc};
use herald_core::Recipient;
use serde::{Deserialize, Serialize};

use crate::notification::{DisplayMode, NotificationKind};

/// Per-recipient channel toggles, contact details, and display timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPreference {
    /// Owner of these preferences.
    pub recipient: Recipient,
    /// Live push over an open connection.
    pub live_enabled: bool,
    /// Toast display mode.
    pub toast_enabled: bool,
    /// Banner display mode.
    pub banner_enabled: bool,
    /// Notification center display mode.
    pub center_enabled: bool,
    /// Out-of-band email.
    pub email_enabled: bool,
    /// Address for email delivery.
    pub email_address: Option<String>,
    /// Display duration for success notifications, in seconds (0 = sticky).
    pub success_duration_secs: i32,
    /// Display duration for info notifications.
    pub info_duration_secs: i32,
    /// Display duration for warning notifications.
    pub warning_duration_secs: i32,
    /// Display duration for error notifications.
    pub error_duration_secs: i32,
    /// Display duration for security notifications.
    pub security_duration_secs: i32,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl DeliveryPreference {
    /// Preferences for a recipient who never saved any: everything enabled,
    /// no email address.
    pub fn default_for(recipient: Recipient) -> Self {
        Self {
            recipient,
            live_enabled: true,
            toast_enabled: true,
            banner_enabled: true,
            center_enabled: true,
            email_enabled: true,
            email_address: None,
            success_duration_secs: 5,
            info_duration_secs: 5,
            warning_duration_secs: 10,
            error_duration_secs: 0,
            security_duration_secs: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether the toggle for `mode` is on.
    pub fn display_mode_enabled(&self, mode: DisplayMode) -> bool {
        match mode {
            DisplayMode::Toast => self.toast_enabled,
            DisplayMode::Banner => self.banner_enabled,
            DisplayMode::Center => self.center_enabled,
        }
    }

    /// Display duration for `kind`; `None` means sticky.
    pub fn duration_for(&self, kind: NotificationKind) -> Option<u32> {
        let secs = match kind {
            NotificationKind::Success => self.success_duration_secs,
            NotificationKind::Info => self.info_duration_secs,
            NotificationKind::Warning => self.warning_duration_secs,
            NotificationKind::Error => self.error_duration_secs,
            NotificationKind::Security => self.security_duration_secs,
        };
        u32::try_from(secs).ok().filter(|s| *s > 0)
    }

    /// The email address, if email is enabled and one is on file.
    pub fn usable_email(&self) -> Option<&str> {
        if !self.email_enabled {
            return None;
        }
        self.email_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_everything() {
        let pref = DeliveryPreference::default_for(Recipient::User(1));
        assert!(pref.live_enabled && pref.email_enabled);
        for mode in DisplayMode::ALL {
            assert!(pref.display_mode_enabled(mode));
        }
        assert!(pref.usable_email().is_none());
    }

    #[test]
    fn test_zero_duration_is_sticky() {
        let pref = DeliveryPreference::default_for(Recipient::Admin(2));
        assert_eq!(pref.duration_for(NotificationKind::Success), Some(5));
        assert_eq!(pref.duration_for(NotificationKind::Security), None);
    }

    #[test]
    fn test_usable_email_respects_toggle() {
        let mut pref = DeliveryPreference::default_for(Recipient::User(1));
        pref.email_address = Some("a@example.com".to_string());
        assert_eq!(pref.usable_email(), Some("a@example.com"));
        pref.email_enabled = false;
        assert!(pref.usable_email().is_none());
    }
}
