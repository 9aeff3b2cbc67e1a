//! `printflow queue` and `printflow dashboard`.

use anyhow::Result;
use console::style;
use serde::Serialize;

use super::parse_status;
use crate::cli::context::{CliContext, Identity};
use crate::cli::display::{
    colorize_department, colorize_status, output, render_list, task_table, CommandOutput,
};
use crate::domain::models::{Department, Task};
use crate::services::DashboardSummary;

#[derive(Debug, Serialize)]
pub struct QueueOutput {
    pub department: Department,
    pub user_id: String,
    pub tasks: Vec<Task>,
}

impl CommandOutput for QueueOutput {
    fn to_human(&self) -> String {
        format!(
            "{} queue for {}\n{}",
            colorize_department(self.department),
            self.user_id,
            render_list("task", &task_table(&self.tasks), self.tasks.len())
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct DashboardOutput {
    pub summary: DashboardSummary,
}

impl CommandOutput for DashboardOutput {
    fn to_human(&self) -> String {
        let s = &self.summary;
        let mut lines = vec![
            format!("{} dashboard", colorize_department(s.department)),
            String::new(),
            format!("  Total       {}", style(s.total).bold()),
            format!("  Urgent      {}", style(s.urgent).red().bold()),
            format!("  In progress {}", style(s.in_progress).yellow()),
            format!("  Completed   {} ({}%)", style(s.completed).green(), s.completion_rate),
            String::new(),
            "By status:".to_string(),
        ];
        for count in &s.by_status {
            lines.push(format!("  {:<28} {}", colorize_status(count.status).to_string(), count.count));
        }
        if !s.recent.is_empty() {
            lines.push(String::new());
            lines.push("Recently updated:".to_string());
            lines.push(task_table(&s.recent).to_string());
        }
        lines.join("\n")
    }
}

pub async fn execute_queue(
    ctx: &CliContext,
    identity: &Identity,
    status: Option<String>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let actor = identity.actor()?;
    let status = status.as_deref().map(parse_status).transpose()?;

    let tasks = ctx
        .queries
        .search(actor.department, &actor.user_id, status, search.as_deref())
        .await?;

    output(
        &QueueOutput {
            department: actor.department,
            user_id: actor.user_id,
            tasks,
        },
        json,
    );
    Ok(())
}

pub async fn execute_dashboard(ctx: &CliContext, identity: &Identity, json: bool) -> Result<()> {
    let actor = identity.actor()?;
    let summary = ctx.queries.dashboard(actor.department, &actor.user_id).await?;
    output(&DashboardOutput { summary }, json);
    Ok(())
}
