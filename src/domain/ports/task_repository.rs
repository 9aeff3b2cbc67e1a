use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskPatch, TaskPriority, TaskStatus, UserId};

/// Filter for listing tasks. Every set field must match; `statuses`,
/// `created_by` and `assigned_to` are combined with OR among themselves
/// so a department queue can be expressed as one query.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    /// Match any of these statuses (OR-ed with the user clauses below)
    pub statuses: Vec<TaskStatus>,
    pub created_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub priority: Option<TaskPriority>,
    /// Case-insensitive substring over title, description and client name
    pub search: Option<String>,
    /// Only tasks updated at or after this instant
    pub updated_since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl TaskFilter {
    /// True when the OR-group (statuses / creator / assignee) is in use.
    pub fn has_membership_clause(&self) -> bool {
        !self.statuses.is_empty() || self.created_by.is_some() || self.assigned_to.is_some()
    }

    /// Evaluate the filter against a task held in memory.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if self.has_membership_clause() {
            let by_status = self.statuses.contains(&task.status);
            let by_creator = self
                .created_by
                .as_deref()
                .is_some_and(|u| task.created_by == u);
            let by_assignee = self
                .assigned_to
                .as_deref()
                .is_some_and(|u| task.assigned_to.as_deref() == Some(u));
            if !(by_status || by_creator || by_assignee) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !task.matches_text(search) {
                return false;
            }
        }
        if let Some(since) = self.updated_since {
            if task.updated_at < since {
                return false;
            }
        }
        true
    }
}

/// Repository port for task persistence.
///
/// A task is stored together with its comments, files and log; reads return
/// the whole aggregate.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task with its initial log entry.
    async fn create(&self, task: &Task) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;

    /// Apply `patch` in a single atomic step and return the updated task.
    ///
    /// Log-appending patches require `expected_version` to equal the stored
    /// version and fail with `Conflict` otherwise; they bump the version.
    /// Comment and file appends ignore `expected_version`.
    async fn update_atomic(
        &self,
        id: Uuid,
        expected_version: Option<u64>,
        patch: TaskPatch,
    ) -> DomainResult<Task>;

    /// List tasks matching the filter, newest first.
    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>>;
}
