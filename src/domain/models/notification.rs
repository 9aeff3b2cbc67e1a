//! Notification domain model.
//!
//! Notifications are derived from task log entries. Each one records the log
//! entry it came from so a replayed event never yields a second row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{TaskLog, UserId};

/// A per-user message derived from a task log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub task_id: Uuid,
    /// Recipient
    pub user_id: UserId,
    /// Time of the source log entry; sorts lists but does not order inserts
    pub created_at: DateTime<Utc>,
    pub read: bool,
    /// Log entry this notification was derived from
    pub source_log_id: Uuid,
}

impl Notification {
    /// Build the unread notification for `log`, addressed to `recipient`.
    ///
    /// The timestamp is the log's own so that a backfilled or replayed
    /// notification sorts where the original would have.
    pub fn from_log(task_id: Uuid, task_title: &str, log: &TaskLog, recipient: impl Into<UserId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: notification_message(&log.action, task_title),
            task_id,
            user_id: recipient.into(),
            created_at: log.performed_at,
            read: false,
            source_log_id: log.id,
        }
    }
}

/// `"{action} - {task title}"`
pub fn notification_message(action: &str, task_title: &str) -> String {
    format!("{action} - {task_title}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_log_copies_source() {
        let log = TaskLog::created("u1", None);
        let task_id = Uuid::new_v4();
        let n = Notification::from_log(task_id, "Brochure", &log, "u1");
        assert_eq!(n.message, "created - Brochure");
        assert_eq!(n.source_log_id, log.id);
        assert_eq!(n.created_at, log.performed_at);
        assert_eq!(n.task_id, task_id);
        assert!(!n.read);
    }
}
