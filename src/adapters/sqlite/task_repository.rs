//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Task, TaskComment, TaskFile, TaskLog, TaskPatch, TaskPriority, TaskStatus,
};
use crate::domain::ports::{TaskFilter, TaskRepository};

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO tasks (id, title, description, client_name, priority, status,
               due_date, created_by, assigned_to, version, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.client_name)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date.map(|d| d.to_string()))
        .bind(&task.created_by)
        .bind(&task.assigned_to)
        .bind(task.version as i64)
        .bind(format_datetime(&task.created_at))
        .bind(format_datetime(&task.updated_at))
        .execute(&mut *tx)
        .await?;

        for log in &task.logs {
            insert_log(&mut tx, task.id, log).await?;
        }
        for comment in &task.comments {
            insert_comment(&mut tx, task.id, comment).await?;
        }
        for file in &task.files {
            insert_file(&mut tx, task.id, file).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let mut conn = self.pool.acquire().await?;
        fetch_task(&mut conn, id).await
    }

    async fn update_atomic(
        &self,
        id: Uuid,
        expected_version: Option<u64>,
        patch: TaskPatch,
    ) -> DomainResult<Task> {
        let mut tx = self.pool.begin().await?;

        match &patch {
            TaskPatch::Transition { log } => {
                let expected = required_version(expected_version, &patch)?;
                let to = log.to_status.ok_or_else(|| {
                    DomainError::validation("Transition log entry must carry a target status")
                })?;

                let result = sqlx::query(
                    r#"UPDATE tasks SET status = ?, version = version + 1,
                       updated_at = MAX(updated_at, ?)
                       WHERE id = ? AND version = ?"#
                )
                .bind(to.as_str())
                .bind(format_datetime(&log.performed_at))
                .bind(id.to_string())
                .bind(expected as i64)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(missing_or_conflict(&mut tx, id, expected).await);
                }
                insert_log(&mut tx, id, log).await?;
            }
            TaskPatch::Assign { assignee, log } => {
                let expected = required_version(expected_version, &patch)?;

                let result = sqlx::query(
                    r#"UPDATE tasks SET assigned_to = ?, version = version + 1,
                       updated_at = MAX(updated_at, ?)
                       WHERE id = ? AND version = ?"#
                )
                .bind(assignee)
                .bind(format_datetime(&log.performed_at))
                .bind(id.to_string())
                .bind(expected as i64)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(missing_or_conflict(&mut tx, id, expected).await);
                }
                insert_log(&mut tx, id, log).await?;
            }
            TaskPatch::AddComment(comment) => {
                touch(&mut tx, id, &format_datetime(&comment.created_at)).await?;
                insert_comment(&mut tx, id, comment).await?;
            }
            TaskPatch::AddFile(file) => {
                touch(&mut tx, id, &format_datetime(&file.uploaded_at)).await?;
                insert_file(&mut tx, id, file).await?;
            }
        }

        let task = fetch_task(&mut tx, id)
            .await?
            .ok_or(DomainError::TaskNotFound(id))?;
        tx.commit().await?;
        Ok(task)
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = String::from("SELECT * FROM tasks WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if filter.has_membership_clause() {
            let mut clauses: Vec<String> = Vec::new();
            if !filter.statuses.is_empty() {
                let placeholders = vec!["?"; filter.statuses.len()].join(", ");
                clauses.push(format!("status IN ({placeholders})"));
                bindings.extend(filter.statuses.iter().map(|s| s.as_str().to_string()));
            }
            if let Some(created_by) = &filter.created_by {
                clauses.push("created_by = ?".to_string());
                bindings.push(created_by.clone());
            }
            if let Some(assigned_to) = &filter.assigned_to {
                clauses.push("assigned_to = ?".to_string());
                bindings.push(assigned_to.clone());
            }
            query.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
        if let Some(priority) = &filter.priority {
            query.push_str(" AND priority = ?");
            bindings.push(priority.as_str().to_string());
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push_str(
                r" AND (LOWER(title) LIKE ? ESCAPE '\' OR LOWER(description) LIKE ? ESCAPE '\' OR LOWER(client_name) LIKE ? ESCAPE '\')",
            );
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            bindings.extend(std::iter::repeat(pattern).take(3));
        }
        if let Some(since) = &filter.updated_since {
            query.push_str(" AND updated_at >= ?");
            bindings.push(format_datetime(since));
        }

        query.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut conn = self.pool.acquire().await?;

        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }
        let rows: Vec<TaskRow> = q.fetch_all(&mut *conn).await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            let mut task: Task = row.try_into()?;
            load_children(&mut conn, &mut task).await?;
            tasks.push(task);
        }
        Ok(tasks)
    }
}

fn required_version(expected: Option<u64>, patch: &TaskPatch) -> DomainResult<u64> {
    expected.ok_or_else(|| {
        DomainError::Validation(format!("{} requires an expected version", patch.kind()))
    })
}

/// Explain why a guarded update touched no row.
async fn missing_or_conflict(conn: &mut SqliteConnection, id: Uuid, expected: u64) -> DomainError {
    let exists: Result<Option<(i64,)>, sqlx::Error> =
        sqlx::query_as("SELECT version FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await;

    match exists {
        Ok(Some(_)) => DomainError::Conflict { task_id: id, expected_version: expected },
        Ok(None) => DomainError::TaskNotFound(id),
        Err(e) => e.into(),
    }
}

async fn touch(conn: &mut SqliteConnection, id: Uuid, at: &str) -> DomainResult<()> {
    let result = sqlx::query("UPDATE tasks SET updated_at = MAX(updated_at, ?) WHERE id = ?")
        .bind(at)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DomainError::TaskNotFound(id));
    }
    Ok(())
}

async fn insert_log(conn: &mut SqliteConnection, task_id: Uuid, log: &TaskLog) -> DomainResult<()> {
    sqlx::query(
        r#"INSERT INTO task_logs (task_id, seq, id, action, from_status, to_status,
           performed_by, performed_at, comment, assignee)
           VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM task_logs WHERE task_id = ?),
                   ?, ?, ?, ?, ?, ?, ?, ?)"#
    )
    .bind(task_id.to_string())
    .bind(task_id.to_string())
    .bind(log.id.to_string())
    .bind(&log.action)
    .bind(log.from_status.map(|s| s.as_str()))
    .bind(log.to_status.map(|s| s.as_str()))
    .bind(&log.performed_by)
    .bind(format_datetime(&log.performed_at))
    .bind(&log.comment)
    .bind(&log.assignee)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_comment(conn: &mut SqliteConnection, task_id: Uuid, comment: &TaskComment) -> DomainResult<()> {
    sqlx::query(
        r#"INSERT INTO task_comments (id, task_id, seq, text, created_by, created_at)
           VALUES (?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM task_comments WHERE task_id = ?), ?, ?, ?)"#
    )
    .bind(comment.id.to_string())
    .bind(task_id.to_string())
    .bind(task_id.to_string())
    .bind(&comment.text)
    .bind(&comment.created_by)
    .bind(format_datetime(&comment.created_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_file(conn: &mut SqliteConnection, task_id: Uuid, file: &TaskFile) -> DomainResult<()> {
    sqlx::query(
        r#"INSERT INTO task_files (id, task_id, seq, name, url, content_type, uploaded_by, uploaded_at)
           VALUES (?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM task_files WHERE task_id = ?), ?, ?, ?, ?, ?)"#
    )
    .bind(file.id.to_string())
    .bind(task_id.to_string())
    .bind(task_id.to_string())
    .bind(&file.name)
    .bind(&file.url)
    .bind(&file.content_type)
    .bind(&file.uploaded_by)
    .bind(format_datetime(&file.uploaded_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn fetch_task(conn: &mut SqliteConnection, id: Uuid) -> DomainResult<Option<Task>> {
    let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => {
            let mut task: Task = r.try_into()?;
            load_children(conn, &mut task).await?;
            Ok(Some(task))
        }
        None => Ok(None),
    }
}

async fn load_children(conn: &mut SqliteConnection, task: &mut Task) -> DomainResult<()> {
    let id = task.id.to_string();

    let logs: Vec<TaskLogRow> = sqlx::query_as(
        r#"SELECT id, action, from_status, to_status, performed_by, performed_at, comment, assignee
           FROM task_logs WHERE task_id = ? ORDER BY seq"#
    )
    .bind(&id)
    .fetch_all(&mut *conn)
    .await?;

    let comments: Vec<CommentRow> = sqlx::query_as(
        "SELECT id, text, created_by, created_at FROM task_comments WHERE task_id = ? ORDER BY seq"
    )
    .bind(&id)
    .fetch_all(&mut *conn)
    .await?;

    let files: Vec<FileRow> = sqlx::query_as(
        r#"SELECT id, name, url, content_type, uploaded_by, uploaded_at
           FROM task_files WHERE task_id = ? ORDER BY seq"#
    )
    .bind(&id)
    .fetch_all(&mut *conn)
    .await?;

    task.logs = logs.into_iter().map(TryInto::try_into).collect::<DomainResult<_>>()?;
    task.comments = comments.into_iter().map(TryInto::try_into).collect::<DomainResult<_>>()?;
    task.files = files.into_iter().map(TryInto::try_into).collect::<DomainResult<_>>()?;
    Ok(())
}

fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn parse_status(value: &str) -> DomainResult<TaskStatus> {
    TaskStatus::from_str(value)
        .ok_or_else(|| DomainError::Serialization(format!("Invalid status: {value}")))
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    title: String,
    description: String,
    client_name: String,
    priority: String,
    status: String,
    due_date: Option<String>,
    created_by: String,
    assigned_to: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let priority = TaskPriority::from_str(&row.priority)
            .ok_or_else(|| DomainError::Serialization(format!("Invalid priority: {}", row.priority)))?;

        let due_date = row
            .due_date
            .map(|s| s.parse::<NaiveDate>())
            .transpose()
            .map_err(|e| DomainError::Serialization(e.to_string()))?;

        Ok(Task {
            id: parse_uuid(&row.id)?,
            title: row.title,
            description: row.description,
            client_name: row.client_name,
            priority,
            status: parse_status(&row.status)?,
            due_date,
            created_by: row.created_by,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            assigned_to: row.assigned_to,
            files: Vec::new(),
            comments: Vec::new(),
            logs: Vec::new(),
            version: row.version as u64,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskLogRow {
    id: String,
    action: String,
    from_status: Option<String>,
    to_status: Option<String>,
    performed_by: String,
    performed_at: String,
    comment: Option<String>,
    assignee: Option<String>,
}

impl TryFrom<TaskLogRow> for TaskLog {
    type Error = DomainError;

    fn try_from(row: TaskLogRow) -> Result<Self, Self::Error> {
        Ok(TaskLog {
            id: parse_uuid(&row.id)?,
            action: row.action,
            from_status: row.from_status.as_deref().map(parse_status).transpose()?,
            to_status: row.to_status.as_deref().map(parse_status).transpose()?,
            performed_by: row.performed_by,
            performed_at: parse_datetime(&row.performed_at)?,
            comment: row.comment,
            assignee: row.assignee,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    text: String,
    created_by: String,
    created_at: String,
}

impl TryFrom<CommentRow> for TaskComment {
    type Error = DomainError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(TaskComment {
            id: parse_uuid(&row.id)?,
            text: row.text,
            created_by: row.created_by,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    name: String,
    url: String,
    content_type: String,
    uploaded_by: String,
    uploaded_at: String,
}

impl TryFrom<FileRow> for TaskFile {
    type Error = DomainError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(TaskFile {
            id: parse_uuid(&row.id)?,
            name: row.name,
            url: row.url,
            content_type: row.content_type,
            uploaded_by: row.uploaded_by,
            uploaded_at: parse_datetime(&row.uploaded_at)?,
        })
    }
}
