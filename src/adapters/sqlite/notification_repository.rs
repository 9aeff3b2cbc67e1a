//! SQLite implementation of the NotificationRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Notification;
use crate::domain::ports::NotificationRepository;

#[derive(Clone)]
pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    async fn insert_if_absent(&self, notification: &Notification) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO notifications
               (id, message, task_id, user_id, created_at, read, source_log_id)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(notification.id.to_string())
        .bind(&notification.message)
        .bind(notification.task_id.to_string())
        .bind(&notification.user_id)
        .bind(format_datetime(&notification.created_at))
        .bind(notification.read)
        .bind(notification.source_log_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as("SELECT * FROM notifications WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_user(&self, user_id: &str, unread_only: bool) -> DomainResult<Vec<Notification>> {
        let query = if unread_only {
            "SELECT * FROM notifications WHERE user_id = ? AND read = 0 ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        };

        let rows: Vec<NotificationRow> = sqlx::query_as(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_read(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotificationNotFound(id));
        }
        Ok(())
    }

    // The implicit rowid is the insertion sequence: rows are never deleted
    // on their own, so every insert gets MAX(rowid) + 1.
    async fn last_sequence(&self) -> DomainResult<u64> {
        let (seq,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(rowid), 0) FROM notifications")
            .fetch_one(&self.pool)
            .await?;

        Ok(seq as u64)
    }

    async fn mark_all_read(&self, user_id: &str, up_to: u64) -> DomainResult<Vec<Uuid>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0 AND rowid <= ? RETURNING id"
        )
        .bind(user_id)
        .bind(up_to as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(id,)| parse_uuid(id)).collect()
    }

    async fn unread_count(&self, user_id: &str) -> DomainResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    message: String,
    task_id: String,
    user_id: String,
    created_at: String,
    read: bool,
    source_log_id: String,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: parse_uuid(&row.id)?,
            message: row.message,
            task_id: parse_uuid(&row.task_id)?,
            user_id: row.user_id,
            created_at: parse_datetime(&row.created_at)?,
            read: row.read,
            source_log_id: parse_uuid(&row.source_log_id)?,
        })
    }
}
