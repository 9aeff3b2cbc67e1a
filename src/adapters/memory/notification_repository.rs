//! In-memory implementation of the NotificationRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Notification;
use crate::domain::ports::NotificationRepository;

#[derive(Debug)]
struct Stored {
    seq: u64,
    notification: Notification,
}

#[derive(Debug, Default)]
struct Store {
    by_id: HashMap<Uuid, Stored>,
    /// source log id -> notification id
    by_source: HashMap<Uuid, Uuid>,
    last_seq: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    store: RwLock<Store>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert_if_absent(&self, notification: &Notification) -> DomainResult<bool> {
        let mut store = self.store.write().await;
        if store.by_source.contains_key(&notification.source_log_id) {
            return Ok(false);
        }
        store.last_seq += 1;
        let stored = Stored {
            seq: store.last_seq,
            notification: notification.clone(),
        };
        store.by_source.insert(notification.source_log_id, notification.id);
        store.by_id.insert(notification.id, stored);
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Notification>> {
        Ok(self.store.read().await.by_id.get(&id).map(|s| s.notification.clone()))
    }

    async fn list_for_user(&self, user_id: &str, unread_only: bool) -> DomainResult<Vec<Notification>> {
        let store = self.store.read().await;
        let mut result: Vec<Notification> = store
            .by_id
            .values()
            .map(|s| &s.notification)
            .filter(|n| n.user_id == user_id && !(unread_only && n.read))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn mark_read(&self, id: Uuid) -> DomainResult<()> {
        let mut store = self.store.write().await;
        let stored = store.by_id.get_mut(&id).ok_or(DomainError::NotificationNotFound(id))?;
        stored.notification.read = true;
        Ok(())
    }

    async fn last_sequence(&self) -> DomainResult<u64> {
        Ok(self.store.read().await.last_seq)
    }

    async fn mark_all_read(&self, user_id: &str, up_to: u64) -> DomainResult<Vec<Uuid>> {
        let mut store = self.store.write().await;
        let mut flipped = Vec::new();
        for stored in store.by_id.values_mut() {
            let n = &mut stored.notification;
            if n.user_id == user_id && !n.read && stored.seq <= up_to {
                n.read = true;
                flipped.push(n.id);
            }
        }
        Ok(flipped)
    }

    async fn unread_count(&self, user_id: &str) -> DomainResult<u64> {
        let store = self.store.read().await;
        let unread = store
            .by_id
            .values()
            .filter(|s| s.notification.user_id == user_id && !s.notification.read)
            .count();
        Ok(unread as u64)
    }
}
