use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use herald_core::result::AppResult;
use herald_core::Recipient;
use herald_entity::preference::DeliveryPreference;

use crate::store::PreferenceStore;

/// In-memory [`PreferenceStore`].
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    rows: RwLock<HashMap<Recipient, DeliveryPreference>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, recipient: Recipient) -> AppResult<Option<DeliveryPreference>> {
        Ok(self.rows.read().await.get(&recipient).cloned())
    }

    async fn upsert(&self, preference: &DeliveryPreference) -> AppResult<DeliveryPreference> {
        self.rows
            .write()
            .await
            .insert(preference.recipient, preference.clone());
        Ok(preference.clone())
    }
}
