use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Notification;

/// Repository port for derived notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Store the notification unless one already exists for its source log
    /// entry. Returns whether a row was inserted.
    async fn insert_if_absent(&self, notification: &Notification) -> DomainResult<bool>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Notification>>;

    /// Notifications for `user_id`, newest first.
    async fn list_for_user(&self, user_id: &str, unread_only: bool) -> DomainResult<Vec<Notification>>;

    /// Set the read flag. Idempotent; errors when the id is unknown.
    async fn mark_read(&self, id: Uuid) -> DomainResult<()>;

    /// Insertion sequence of the newest stored notification, 0 when empty.
    /// Sequences grow with every insert, whatever the notification's
    /// `created_at`.
    async fn last_sequence(&self) -> DomainResult<u64>;

    /// Mark every unread notification of `user_id` inserted at or before
    /// sequence `up_to` as read. Returns the ids flipped.
    async fn mark_all_read(&self, user_id: &str, up_to: u64) -> DomainResult<Vec<Uuid>>;

    async fn unread_count(&self, user_id: &str) -> DomainResult<u64>;
}
