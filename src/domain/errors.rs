//! Domain errors for the printflow workflow engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::models::{Department, TaskStatus};

/// Domain-level errors that can occur in the workflow engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Notification not found: {0}")]
    NotificationNotFound(Uuid),

    #[error("Task {task_id} has no file {file_id}")]
    FileNotFound { task_id: Uuid, file_id: Uuid },

    #[error("Department {department} may not move a task from {from} to {to}")]
    ForbiddenTransition {
        from: TaskStatus,
        to: TaskStatus,
        department: Department,
    },

    #[error("Concurrency conflict: task {task_id} is no longer at version {expected_version}")]
    Conflict { task_id: Uuid, expected_version: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Stable discriminant surfaced to callers so they can map failures to
/// user-facing messages without matching on error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    ForbiddenTransition,
    Conflict,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::ForbiddenTransition => "forbidden_transition",
            Self::Conflict => "conflict",
            Self::Storage => "storage",
        }
    }

    /// Only a version conflict is worth resubmitting after a reload.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::TaskNotFound(_) | Self::NotificationNotFound(_) | Self::FileNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::ForbiddenTransition { .. } => ErrorKind::ForbiddenTransition,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Storage(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(DomainError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(DomainError::TaskNotFound(Uuid::new_v4()).kind(), ErrorKind::NotFound);
        assert_eq!(
            DomainError::NotificationNotFound(Uuid::new_v4()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DomainError::Serialization("bad json".to_string()).kind(),
            ErrorKind::Storage
        );
        let forbidden = DomainError::ForbiddenTransition {
            from: TaskStatus::InDesign,
            to: TaskStatus::Completed,
            department: Department::Design,
        };
        assert_eq!(forbidden.kind(), ErrorKind::ForbiddenTransition);
        assert!(!forbidden.kind().is_retriable());
    }

    #[test]
    fn test_only_conflict_is_retriable() {
        let conflict = DomainError::Conflict {
            task_id: Uuid::new_v4(),
            expected_version: 3,
        };
        assert!(conflict.kind().is_retriable());
        assert!(!ErrorKind::Storage.is_retriable());
        assert!(!ErrorKind::Validation.is_retriable());
    }

    #[test]
    fn test_forbidden_message_names_statuses() {
        let err = DomainError::ForbiddenTransition {
            from: TaskStatus::InDesign,
            to: TaskStatus::Completed,
            department: Department::Design,
        };
        assert_eq!(
            err.to_string(),
            "Department design may not move a task from in_design to completed"
        );
    }
}
