//! Task domain model.
//!
//! A task is a unit of print-shop work routed through the departments until
//! it is completed. Its log is an append-only audit trail: the creation entry
//! is written together with the task, and every later status change or
//! reassignment appends exactly one entry.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Opaque user identifier supplied by the identity provider.
pub type UserId = String;

/// Log action label for the creation entry.
pub const ACTION_CREATED: &str = "created";
/// Log action label for a status transition.
pub const ACTION_STATUS_CHANGED: &str = "status_changed";
/// Log action label for a reassignment.
pub const ACTION_ASSIGNED: &str = "assigned";

/// Stage of a task in the department pipeline.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Freshly created, not yet picked up by sales
    #[default]
    New,
    InSales,
    InDesign,
    InManagement,
    InProduction,
    /// Terminal: no department may act on a completed task
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        Self::New,
        Self::InSales,
        Self::InDesign,
        Self::InManagement,
        Self::InProduction,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InSales => "in_sales",
            Self::InDesign => "in_design",
            Self::InManagement => "in_management",
            Self::InProduction => "in_production",
            Self::Completed => "completed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "new" => Some(Self::New),
            "in_sales" | "sales" => Some(Self::InSales),
            "in_design" | "design" => Some(Self::InDesign),
            "in_management" | "management" => Some(Self::InManagement),
            "in_production" | "production" => Some(Self::InProduction),
            "completed" | "complete" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InSales => "In sales",
            Self::InDesign => "In design",
            Self::InManagement => "In management",
            Self::InProduction => "In production",
            Self::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority level for tasks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Urgent = 4,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }

    /// High and urgent tasks are surfaced on the dashboard.
    pub fn is_pressing(&self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record of a creation, transition or reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: Uuid,
    /// Human-readable label (`created`, `status_changed`, `assigned`)
    pub action: String,
    /// Absent for the creation entry
    pub from_status: Option<TaskStatus>,
    /// Present for creation and every transition, absent for reassignment
    pub to_status: Option<TaskStatus>,
    pub performed_by: UserId,
    pub performed_at: DateTime<Utc>,
    pub comment: Option<String>,
    /// Assignee in effect from this entry on. Set by creation and
    /// reassignment entries; transitions leave it `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,
}

impl TaskLog {
    /// The entry written together with a new task.
    pub fn created(performed_by: impl Into<UserId>, assignee: Option<UserId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: ACTION_CREATED.to_string(),
            from_status: None,
            to_status: Some(TaskStatus::New),
            performed_by: performed_by.into(),
            performed_at: Utc::now(),
            comment: None,
            assignee,
        }
    }

    /// Whether this entry sets the assignee.
    pub fn sets_assignee(&self) -> bool {
        self.action == ACTION_CREATED || self.action == ACTION_ASSIGNED
    }

    pub fn status_change(
        from: TaskStatus,
        to: TaskStatus,
        performed_by: impl Into<UserId>,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: ACTION_STATUS_CHANGED.to_string(),
            from_status: Some(from),
            to_status: Some(to),
            performed_by: performed_by.into(),
            performed_at: Utc::now(),
            comment: normalize_optional(comment),
            assignee: None,
        }
    }

    pub fn assigned(performed_by: impl Into<UserId>, assignee: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: ACTION_ASSIGNED.to_string(),
            from_status: None,
            to_status: None,
            performed_by: performed_by.into(),
            performed_at: Utc::now(),
            comment: Some(format!("assigned to {assignee}")),
            assignee: Some(assignee.to_string()),
        }
    }
}

/// A free-text comment on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: Uuid,
    pub text: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl TaskComment {
    /// Build a comment, rejecting text that is empty after trimming.
    pub fn new(text: &str, created_by: impl Into<UserId>) -> DomainResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("Comment text cannot be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        })
    }
}

/// Metadata describing a blob that already lives in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    /// Opaque reference returned by the blob store
    pub url: String,
    /// MIME-like type string
    pub content_type: String,
}

/// A file reference recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,
}

impl TaskFile {
    pub fn new(metadata: FileMetadata, uploaded_by: impl Into<UserId>) -> DomainResult<Self> {
        let name = metadata.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("File name cannot be empty"));
        }
        if metadata.url.trim().is_empty() {
            return Err(DomainError::validation("File url cannot be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: metadata.url,
            content_type: metadata.content_type,
            uploaded_by: uploaded_by.into(),
            uploaded_at: Utc::now(),
        })
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub client_name: String,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<UserId>,
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            client_name: client_name.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<UserId>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }
}

/// A change applied to a stored task in one atomic step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPatch {
    /// Move to `log.to_status` and append the log entry.
    Transition { log: TaskLog },
    /// Set the assignee and append the log entry.
    Assign { assignee: UserId, log: TaskLog },
    AddComment(TaskComment),
    AddFile(TaskFile),
}

impl TaskPatch {
    /// Log-appending patches are guarded by the task version; comment and
    /// file appends commute with everything else.
    pub fn requires_version(&self) -> bool {
        matches!(self, Self::Transition { .. } | Self::Assign { .. })
    }

    pub fn log(&self) -> Option<&TaskLog> {
        match self {
            Self::Transition { log } | Self::Assign { log, .. } => Some(log),
            Self::AddComment(_) | Self::AddFile(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transition { .. } => "transition",
            Self::Assign { .. } => "assign",
            Self::AddComment(_) => "add_comment",
            Self::AddFile(_) => "add_file",
        }
    }
}

/// A unit of work routed through the departments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub client_name: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_to: Option<UserId>,
    pub files: Vec<TaskFile>,
    pub comments: Vec<TaskComment>,
    pub logs: Vec<TaskLog>,
    /// Bumped on every log append; used for optimistic locking
    pub version: u64,
}

impl Task {
    /// Build a new task with status `new` and its creation log entry.
    pub fn create(input: NewTask, created_by: impl Into<UserId>) -> DomainResult<Self> {
        let created_by = created_by.into();
        let title = required_field("title", &input.title)?;
        let description = required_field("description", &input.description)?;
        let client_name = required_field("client name", &input.client_name)?;

        let assigned_to = normalize_optional(input.assigned_to);
        let log = TaskLog::created(created_by.clone(), assigned_to.clone());
        let now = log.performed_at;

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            description,
            client_name,
            priority: input.priority,
            status: TaskStatus::New,
            due_date: input.due_date,
            created_by,
            created_at: now,
            updated_at: now,
            assigned_to,
            files: Vec::new(),
            comments: Vec::new(),
            logs: vec![log],
            version: 1,
        })
    }

    /// The creation entry (always the first log).
    pub fn creation_log(&self) -> Option<&TaskLog> {
        self.logs.first()
    }

    pub fn last_log(&self) -> Option<&TaskLog> {
        self.logs.last()
    }

    /// Status according to the audit trail: the `to_status` of the most
    /// recent entry that carries one.
    pub fn status_from_logs(&self) -> Option<TaskStatus> {
        self.logs.iter().rev().find_map(|log| log.to_status)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Replay the log, pairing every entry with the assignee in effect right
    /// after it was appended.
    pub fn logs_with_assignee(&self) -> impl Iterator<Item = (&TaskLog, Option<&str>)> + '_ {
        let mut current: Option<&str> = None;
        self.logs.iter().map(move |log| {
            if log.sets_assignee() {
                current = log.assignee.as_deref();
            }
            (log, current)
        })
    }

    /// Apply a patch in place. Callers holding the stored record use this to
    /// keep the in-memory view identical to what the storage backend writes.
    pub fn apply(&mut self, patch: TaskPatch) -> DomainResult<()> {
        match patch {
            TaskPatch::Transition { log } => {
                let to = log.to_status.ok_or_else(|| {
                    DomainError::validation("Transition log entry must carry a target status")
                })?;
                self.status = to;
                self.touch(log.performed_at);
                self.logs.push(log);
                self.version += 1;
            }
            TaskPatch::Assign { assignee, log } => {
                self.assigned_to = Some(assignee);
                self.touch(log.performed_at);
                self.logs.push(log);
                self.version += 1;
            }
            TaskPatch::AddComment(comment) => {
                self.touch(comment.created_at);
                self.comments.push(comment);
            }
            TaskPatch::AddFile(file) => {
                self.touch(file.uploaded_at);
                self.files.push(file);
            }
        }
        Ok(())
    }

    /// Advance `updated_at` without ever moving it backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }

    /// Case-insensitive match over title, description and client name.
    pub fn matches_text(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.client_name.to_lowercase().contains(&query)
    }
}

fn required_field(name: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("Task {name} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewTask {
        NewTask::new("Brochure", "A5, 12 pages", "Dawn Investments")
    }

    #[test]
    fn test_create_writes_single_creation_log() {
        let task = Task::create(sample(), "u1").unwrap();
        assert_eq!(task.status, TaskStatus::New);
        assert_eq!(task.logs.len(), 1);
        let log = &task.logs[0];
        assert_eq!(log.action, ACTION_CREATED);
        assert_eq!(log.from_status, None);
        assert_eq!(log.to_status, Some(TaskStatus::New));
        assert_eq!(log.performed_by, "u1");
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.files.is_empty() && task.comments.is_empty());
        assert_eq!(task.version, 1);
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        for input in [
            NewTask::new("  ", "d", "c"),
            NewTask::new("t", "\n\t", "c"),
            NewTask::new("t", "d", ""),
        ] {
            let err = Task::create(input, "u1").unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn test_create_trims_fields_and_blank_assignee() {
        let task = Task::create(
            NewTask::new("  Flyer ", " d ", " Acme ").with_assignee("   "),
            "u1",
        )
        .unwrap();
        assert_eq!(task.title, "Flyer");
        assert_eq!(task.client_name, "Acme");
        assert_eq!(task.assigned_to, None);
    }

    #[test]
    fn test_apply_transition_appends_and_bumps_version() {
        let mut task = Task::create(sample(), "u1").unwrap();
        let log = TaskLog::status_change(TaskStatus::New, TaskStatus::InDesign, "u1", None);
        task.apply(TaskPatch::Transition { log }).unwrap();

        assert_eq!(task.status, TaskStatus::InDesign);
        assert_eq!(task.logs.len(), 2);
        assert_eq!(task.version, 2);
        assert_eq!(task.status_from_logs(), Some(TaskStatus::InDesign));
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn test_assign_keeps_status_invariant() {
        let mut task = Task::create(sample(), "u1").unwrap();
        let log = TaskLog::assigned("u1", "u2");
        task.apply(TaskPatch::Assign { assignee: "u2".to_string(), log }).unwrap();

        assert_eq!(task.assigned_to.as_deref(), Some("u2"));
        assert_eq!(task.status, TaskStatus::New);
        assert_eq!(task.status_from_logs(), Some(TaskStatus::New));
        assert_eq!(task.version, 2);
    }

    #[test]
    fn test_log_replay_recovers_assignee_per_entry() {
        let mut task = Task::create(sample().with_assignee("d1"), "u1").unwrap();
        assert_eq!(task.logs[0].assignee.as_deref(), Some("d1"));

        let to_design = TaskLog::status_change(TaskStatus::New, TaskStatus::InDesign, "u1", None);
        task.apply(TaskPatch::Transition { log: to_design }).unwrap();
        let reassign = TaskLog::assigned("u1", "d2");
        task.apply(TaskPatch::Assign { assignee: "d2".into(), log: reassign }).unwrap();
        let back = TaskLog::status_change(TaskStatus::InDesign, TaskStatus::InSales, "d2", None);
        task.apply(TaskPatch::Transition { log: back }).unwrap();

        let replayed: Vec<Option<&str>> = task.logs_with_assignee().map(|(_, a)| a).collect();
        assert_eq!(replayed, vec![Some("d1"), Some("d1"), Some("d2"), Some("d2")]);
        assert_eq!(task.assigned_to.as_deref(), Some("d2"));
    }

    #[test]
    fn test_comment_does_not_bump_version() {
        let mut task = Task::create(sample(), "u1").unwrap();
        let comment = TaskComment::new("use brand colours", "u1").unwrap();
        task.apply(TaskPatch::AddComment(comment)).unwrap();
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.version, 1);
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut task = Task::create(sample(), "u1").unwrap();
        let before = task.updated_at;
        task.touch(before - chrono::Duration::seconds(30));
        assert_eq!(task.updated_at, before);
    }

    #[test]
    fn test_blank_comment_rejected() {
        assert!(TaskComment::new("   ", "u1").is_err());
        assert_eq!(TaskComment::new(" ok ", "u1").unwrap().text, "ok");
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_str("In-Design"), Some(TaskStatus::InDesign));
        assert_eq!(TaskStatus::from_str("archived"), None);
    }

    #[test]
    fn test_matches_text() {
        let task = Task::create(sample(), "u1").unwrap();
        assert!(task.matches_text("brochure"));
        assert!(task.matches_text("DAWN"));
        assert!(task.matches_text("12 pages"));
        assert!(!task.matches_text("poster"));
        assert!(task.matches_text("  "));
    }
}
