//! Per-recipient delivery preferences with defaults.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use herald_core::{AppError, AppResult, Recipient};
use herald_database::PreferenceStore;
use herald_entity::notification::NotificationKind;
use herald_entity::preference::DeliveryPreference;

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    pub live_enabled: Option<bool>,
    pub toast_enabled: Option<bool>,
    pub banner_enabled: Option<bool>,
    pub center_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    /// `Some("")` clears the address.
    pub email_address: Option<String>,
    pub success_duration_secs: Option<i32>,
    pub info_duration_secs: Option<i32>,
    pub warning_duration_secs: Option<i32>,
    pub error_duration_secs: Option<i32>,
    pub security_duration_secs: Option<i32>,
}

impl PreferenceUpdate {
    fn apply(self, pref: &mut DeliveryPreference) -> AppResult<()> {
        let durations = [
            self.success_duration_secs,
            self.info_duration_secs,
            self.warning_duration_secs,
            self.error_duration_secs,
            self.security_duration_secs,
        ];
        if durations.iter().flatten().any(|secs| *secs < 0) {
            return Err(AppError::validation("Display durations must not be negative"));
        }

        if let Some(v) = self.live_enabled {
            pref.live_enabled = v;
        }
        if let Some(v) = self.toast_enabled {
            pref.toast_enabled = v;
        }
        if let Some(v) = self.banner_enabled {
            pref.banner_enabled = v;
        }
        if let Some(v) = self.center_enabled {
            pref.center_enabled = v;
        }
        if let Some(v) = self.email_enabled {
            pref.email_enabled = v;
        }
        if let Some(address) = self.email_address {
            let address = address.trim();
            if address.is_empty() {
                pref.email_address = None;
            } else if !address.contains('@') {
                return Err(AppError::validation(format!(
                    "Invalid email address '{address}'"
                )));
            } else {
                pref.email_address = Some(address.to_string());
            }
        }
        if let Some(v) = self.success_duration_secs {
            pref.success_duration_secs = v;
        }
        if let Some(v) = self.info_duration_secs {
            pref.info_duration_secs = v;
        }
        if let Some(v) = self.warning_duration_secs {
            pref.warning_duration_secs = v;
        }
        if let Some(v) = self.error_duration_secs {
            pref.error_duration_secs = v;
        }
        if let Some(v) = self.security_duration_secs {
            pref.security_duration_secs = v;
        }
        Ok(())
    }
}

/// Reads and writes delivery preferences.
#[derive(Debug, Clone)]
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    /// Create the service.
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Saved preferences, or the defaults.
    pub async fn get(&self, recipient: Recipient) -> AppResult<DeliveryPreference> {
        Ok(self
            .store
            .get(recipient)
            .await?
            .unwrap_or_else(|| DeliveryPreference::default_for(recipient)))
    }

    /// Apply `update` on top of the current preferences and save.
    pub async fn update(
        &self,
        recipient: Recipient,
        update: PreferenceUpdate,
    ) -> AppResult<DeliveryPreference> {
        let mut pref = self.get(recipient).await?;
        update.apply(&mut pref)?;
        pref.updated_at = Utc::now();

        let saved = self.store.upsert(&pref).await?;
        info!(recipient = %recipient, "Delivery preferences updated");
        Ok(saved)
    }

    /// Display duration for `kind`; `None` is sticky.
    pub async fn duration_for(
        &self,
        recipient: Recipient,
        kind: NotificationKind,
    ) -> AppResult<Option<u32>> {
        Ok(self.get(recipient).await?.duration_for(kind))
    }
}

#[cfg(test)]
mod tests {
    use herald_database::memory::MemoryPreferenceStore;

    use super::*;

    fn service() -> PreferenceService {
        PreferenceService::new(Arc::new(MemoryPreferenceStore::new()))
    }

    #[tokio::test]
    async fn test_missing_preferences_resolve_to_defaults() {
        let pref = service().get(Recipient::Admin(4)).await.unwrap();
        assert_eq!(pref.recipient, Recipient::Admin(4));
        assert!(pref.live_enabled);
        assert!(pref.email_address.is_none());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let svc = service();
        let recipient = Recipient::User(1);

        svc.update(
            recipient,
            PreferenceUpdate {
                banner_enabled: Some(false),
                email_address: Some(" ada@example.com ".to_string()),
                warning_duration_secs: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let pref = svc.get(recipient).await.unwrap();
        assert!(!pref.banner_enabled);
        assert!(pref.toast_enabled);
        assert_eq!(pref.usable_email(), Some("ada@example.com"));
        assert_eq!(
            svc.duration_for(recipient, NotificationKind::Warning).await.unwrap(),
            None
        );
        assert_eq!(
            svc.duration_for(recipient, NotificationKind::Info).await.unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let svc = service();
        let negative = PreferenceUpdate {
            info_duration_secs: Some(-1),
            ..Default::default()
        };
        assert!(svc.update(Recipient::User(1), negative).await.is_err());

        let bad_address = PreferenceUpdate {
            email_address: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(svc.update(Recipient::User(1), bad_address).await.is_err());
    }
}
