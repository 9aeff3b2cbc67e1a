//! `printflow task ...` commands.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use super::{parse_priority, parse_status};
use crate::cli::context::{CliContext, Identity};
use crate::cli::display::{
    action_success, colorize_department, colorize_priority, colorize_status, count_label, output,
    render_list, task_table, timestamp, CommandOutput, DetailView,
};
use crate::cli::id_resolver::resolve_task_id;
use crate::cli::types::TaskCommands;
use crate::domain::models::{Department, NewTask, Task, TaskLog, TaskStatus};
use crate::domain::ports::TaskFilter;

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct TaskDetailOutput {
    pub task: Task,
}

impl CommandOutput for TaskDetailOutput {
    fn to_human(&self) -> String {
        let task = &self.task;
        let mut view = DetailView::new(&task.title)
            .field("ID", task.id)
            .field("Client", &task.client_name)
            .field("Status", colorize_status(task.status))
            .field("Priority", colorize_priority(task.priority))
            .field_opt("Assigned", task.assigned_to.as_deref())
            .field("Created by", &task.created_by)
            .field("Created", timestamp(&task.created_at))
            .field("Updated", timestamp(&task.updated_at))
            .field("Version", task.version);
        if let Some(due) = task.due_date {
            view = view.field("Due", due.format("%Y-%m-%d"));
        }

        view = view.section("Description").item(&task.description);

        view = view.section_or("Comments", "no comments yet");
        for comment in &task.comments {
            view = view.item(format!(
                "{} ({}, {})",
                comment.text,
                comment.created_by,
                timestamp(&comment.created_at)
            ));
        }

        view = view.section_or("Files", "no files attached");
        for file in &task.files {
            view = view.item(format!("{} [{}] {}", file.name, file.content_type, file.url));
        }

        view.render()
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct TaskListOutput {
    pub tasks: Vec<Task>,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        render_list("task", &task_table(&self.tasks), self.tasks.len())
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    pub task_id: Uuid,
    pub logs: Vec<TaskLog>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "History of {} ({}):",
            self.task_id,
            count_label(self.logs.len(), "entry", "entries")
        )];
        for log in &self.logs {
            let movement = match (log.from_status, log.to_status) {
                (Some(from), Some(to)) => format!("{} -> {}", colorize_status(from), colorize_status(to)),
                (None, Some(to)) => format!("-> {}", colorize_status(to)),
                _ => String::new(),
            };
            let mut line = format!(
                "  {}  {:<15} {:<12} {}",
                timestamp(&log.performed_at),
                log.action,
                log.performed_by,
                movement
            );
            if let Some(comment) = &log.comment {
                line.push_str(&format!("  \"{comment}\""));
            }
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct AllowedOutput {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub department: Department,
    pub allowed: Vec<TaskStatus>,
}

impl CommandOutput for AllowedOutput {
    fn to_human(&self) -> String {
        let header = format!(
            "{} may move this task from {} to:",
            colorize_department(self.department),
            colorize_status(self.status)
        );
        if self.allowed.is_empty() {
            return format!("{header}\n  (nothing)");
        }
        let targets: Vec<String> = self
            .allowed
            .iter()
            .map(|s| format!("  - {} ({})", colorize_status(*s), s.as_str()))
            .collect();
        format!("{header}\n{}", targets.join("\n"))
    }
}

#[derive(Debug, Serialize)]
pub struct TaskActionOutput {
    pub message: String,
    pub task: Task,
}

impl CommandOutput for TaskActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(command: TaskCommands, ctx: &CliContext, identity: &Identity, json: bool) -> Result<()> {
    match command {
        TaskCommands::Create {
            title,
            description,
            client,
            priority,
            due,
            assignee,
        } => {
            let actor = identity.actor()?;
            let mut input = NewTask::new(title, description, client).with_priority(parse_priority(&priority)?);
            if let Some(due) = due {
                input = input.with_due_date(due);
            }
            if let Some(assignee) = assignee {
                input = input.with_assignee(assignee);
            }
            let task = ctx.engine.create_task(input, &actor).await?;
            output(
                &TaskActionOutput {
                    message: format!("Created task {} ({})", task.title, task.id),
                    task,
                },
                json,
            );
        }

        TaskCommands::Show { id } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let task = ctx.engine.get_task(task_id).await?;
            output(&TaskDetailOutput { task }, json);
        }

        TaskCommands::List {
            status,
            priority,
            assigned_to,
            created_by,
            search,
            limit,
        } => {
            let filter = TaskFilter {
                status: status.as_deref().map(parse_status).transpose()?,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                assigned_to,
                created_by,
                search,
                limit: Some(limit),
                ..TaskFilter::default()
            };
            let tasks = ctx.queries.list(filter).await?;
            output(&TaskListOutput { tasks }, json);
        }

        TaskCommands::Transition { id, to, comment, retry } => {
            let actor = identity.actor()?;
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let target = parse_status(&to)?;

            let task = if retry {
                ctx.retry
                    .retry_on_conflict(|| ctx.engine.transition(task_id, target, &actor, comment.clone()))
                    .await?
            } else {
                ctx.engine.transition(task_id, target, &actor, comment).await?
            };
            output(
                &TaskActionOutput {
                    message: format!("{} is now {}", task.title, task.status.label()),
                    task,
                },
                json,
            );
        }

        TaskCommands::Assign { id, assignee } => {
            let actor = identity.actor()?;
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let task = ctx.engine.assign(task_id, &assignee, &actor).await?;
            output(
                &TaskActionOutput {
                    message: format!("{} assigned to {}", task.title, assignee.trim()),
                    task,
                },
                json,
            );
        }

        TaskCommands::Comment { id, text } => {
            let user = identity.user_id()?;
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let task = ctx.ledger.add_comment(task_id, &text, &user).await?;
            output(
                &TaskActionOutput {
                    message: format!("Comment added to {}", task.title),
                    task,
                },
                json,
            );
        }

        TaskCommands::Attach { id, path, content_type } => {
            let user = identity.user_id()?;
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "attachment".to_string());
            let content_type = content_type.unwrap_or_else(|| guess_content_type(&path).to_string());

            let task = ctx
                .ledger
                .upload_file(task_id, &name, &content_type, bytes, &user)
                .await?;
            output(
                &TaskActionOutput {
                    message: format!("Attached {name} to {}", task.title),
                    task,
                },
                json,
            );
        }

        TaskCommands::History { id } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let logs = ctx.engine.history(task_id).await?;
            output(&HistoryOutput { task_id, logs }, json);
        }

        TaskCommands::Allowed { id } => {
            let actor = identity.actor()?;
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let task = ctx.engine.get_task(task_id).await?;
            let allowed = ctx.engine.allowed_transitions(task_id, &actor).await?;
            output(
                &AllowedOutput {
                    task_id,
                    status: task.status,
                    department: actor.department,
                    allowed,
                },
                json,
            );
        }
    }

    Ok(())
}

/// MIME type from the file extension; `application/octet-stream` otherwise.
fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "ai" | "eps" => "application/postscript",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
