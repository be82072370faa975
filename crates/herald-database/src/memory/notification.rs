use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::types::{NotificationId, PageRequest, PageResponse};
use herald_core::Recipient;
use herald_entity::notification::{Notification, NotificationStats};

use super::paginate;
use crate::store::NotificationStore;

/// In-memory [`NotificationStore`].
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    rows: RwLock<HashMap<NotificationId, Notification>>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, expired ones included.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn not_found(id: NotificationId) -> AppError {
    AppError::not_found(format!("Notification {id} not found"))
}

fn owned_mut(
    rows: &mut HashMap<NotificationId, Notification>,
    id: NotificationId,
    recipient: Recipient,
) -> AppResult<&mut Notification> {
    rows.get_mut(&id)
        .filter(|n| n.recipient == recipient)
        .ok_or_else(|| not_found(id))
}

/// Newest first, id as tie breaker.
fn newest_first(mut rows: Vec<Notification>) -> Vec<Notification> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    rows
}

fn trim_recipient(
    rows: &mut HashMap<NotificationId, Notification>,
    recipient: Recipient,
    cap: u64,
    now: DateTime<Utc>,
) -> u64 {
    let live: Vec<Notification> = rows
        .values()
        .filter(|n| n.recipient == recipient && !n.is_expired_at(now))
        .cloned()
        .collect();
    let evicted: Vec<NotificationId> = newest_first(live)
        .into_iter()
        .skip(cap as usize)
        .map(|n| n.id)
        .collect();
    for id in &evicted {
        rows.remove(id);
    }
    evicted.len() as u64
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, notification: &Notification) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&notification.id) {
            return Err(AppError::conflict(format!(
                "Notification {} already exists",
                notification.id
            )));
        }
        rows.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn get_by_id(
        &self,
        id: NotificationId,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<Notification> {
        self.rows
            .read()
            .await
            .get(&id)
            .filter(|n| n.recipient == recipient && !n.is_expired_at(now))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn list_by_recipient(
        &self,
        recipient: Recipient,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>> {
        let rows = self.rows.read().await;
        let matching = rows
            .values()
            .filter(|n| n.recipient == recipient && n.is_listed_at(now))
            .cloned()
            .collect();
        Ok(paginate(newest_first(matching), page))
    }

    async fn list_unread(
        &self,
        recipient: Recipient,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>> {
        let rows = self.rows.read().await;
        let matching = rows
            .values()
            .filter(|n| n.recipient == recipient && n.is_unread_at(now))
            .cloned()
            .collect();
        Ok(paginate(newest_first(matching), page))
    }

    async fn unread_count(&self, recipient: Recipient, now: DateTime<Utc>) -> AppResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|n| n.recipient == recipient && n.is_unread_at(now))
            .count() as u64)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let n = owned_mut(&mut rows, id, recipient)?;
        if !n.read {
            n.read = true;
            n.read_at = Some(now);
        }
        Ok(())
    }

    async fn mark_all_read(&self, recipient: Recipient, now: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let mut changed = 0;
        for n in rows
            .values_mut()
            .filter(|n| n.recipient == recipient && !n.read && !n.is_expired_at(now))
        {
            n.read = true;
            n.read_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn dismiss(&self, id: NotificationId, recipient: Recipient) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        owned_mut(&mut rows, id, recipient)?.dismissed = true;
        Ok(())
    }

    async fn delete(&self, id: NotificationId, recipient: Recipient) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        owned_mut(&mut rows, id, recipient)?;
        rows.remove(&id);
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, n| !n.is_expired_at(now));
        Ok((before - rows.len()) as u64)
    }

    async fn enforce_limit(
        &self,
        recipient: Recipient,
        cap: u64,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        Ok(trim_recipient(&mut rows, recipient, cap, now))
    }

    async fn enforce_limit_all(&self, cap: u64, now: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let recipients: HashSet<Recipient> = rows.values().map(|n| n.recipient).collect();
        Ok(recipients
            .into_iter()
            .map(|r| trim_recipient(&mut rows, r, cap, now))
            .sum())
    }

    async fn statistics(
        &self,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationStats> {
        let rows = self.rows.read().await;
        Ok(NotificationStats::from_rows(
            rows.values()
                .filter(|n| n.recipient == recipient && !n.is_expired_at(now)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use herald_core::error::ErrorKind;
    use herald_entity::notification::{DisplayMode, NewNotification, NotificationKind};

    use super::*;

    fn note(recipient: Recipient, created_at: DateTime<Utc>, ttl_days: i64) -> Notification {
        NewNotification {
            recipient,
            kind: NotificationKind::Info,
            display_mode: DisplayMode::Center,
            title: "t".to_string(),
            body: "b".to_string(),
            action: None,
            expires_at: None,
        }
        .into_notification(created_at, ttl_days)
    }

    #[tokio::test]
    async fn test_enforce_limit_evicts_oldest() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let user = Recipient::User(1);
        let mut ids = Vec::new();
        for i in 0..5 {
            let n = note(user, now + Duration::seconds(i), 30);
            ids.push(n.id);
            store.create(&n).await.unwrap();
        }
        let evicted = store.enforce_limit(user, 3, now).await.unwrap();
        assert_eq!(evicted, 2);

        let page = store
            .list_by_recipient(user, PageRequest::default(), now)
            .await
            .unwrap();
        let kept: Vec<_> = page.items.iter().map(|n| n.id).collect();
        assert_eq!(kept, vec![ids[4], ids[3], ids[2]]);
    }

    #[tokio::test]
    async fn test_limit_is_per_recipient() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        for i in 0..3 {
            store
                .create(&note(Recipient::User(1), now + Duration::seconds(i), 30))
                .await
                .unwrap();
            store
                .create(&note(Recipient::Admin(1), now + Duration::seconds(i), 30))
                .await
                .unwrap();
        }
        assert_eq!(store.enforce_limit_all(2, now).await.unwrap(), 2);
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn test_expired_rows_hidden_then_swept() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let user = Recipient::User(1);
        let old = note(user, now - Duration::days(2), 1);
        let fresh = note(user, now, 30);
        store.create(&old).await.unwrap();
        store.create(&fresh).await.unwrap();

        assert_eq!(store.unread_count(user, now).await.unwrap(), 1);
        let err = store.get_by_id(old.id, user, now).await.unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(store.cleanup_expired(now).await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_read_and_dismiss_are_independent() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let user = Recipient::User(1);
        let n = note(user, now, 30);
        store.create(&n).await.unwrap();

        store.dismiss(n.id, user).await.unwrap();
        let row = store.get_by_id(n.id, user, now).await.unwrap();
        assert!(row.dismissed);
        assert!(!row.read);
        assert_eq!(store.unread_count(user, now).await.unwrap(), 0);

        store.mark_read(n.id, user, now).await.unwrap();
        let row = store.get_by_id(n.id, user, now).await.unwrap();
        assert!(row.read && row.dismissed);
    }

    #[tokio::test]
    async fn test_foreign_id_is_not_found() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let n = note(Recipient::User(1), now, 30);
        store.create(&n).await.unwrap();

        for err in [
            store.mark_read(n.id, Recipient::User(2), now).await.unwrap_err(),
            store.dismiss(n.id, Recipient::Admin(1)).await.unwrap_err(),
            store.delete(n.id, Recipient::User(2)).await.unwrap_err(),
            store.delete(NotificationId::new(), Recipient::User(1)).await.unwrap_err(),
        ] {
            assert_eq!(err.kind, ErrorKind::NotFound);
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_changes() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let user = Recipient::User(1);
        for _ in 0..3 {
            store.create(&note(user, now, 30)).await.unwrap();
        }
        assert_eq!(store.mark_all_read(user, now).await.unwrap(), 3);
        assert_eq!(store.mark_all_read(user, now).await.unwrap(), 0);

        let stats = store.statistics(user, now).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.read, 3);
        assert_eq!(stats.by_kind.get("info"), Some(&3));
    }
}
