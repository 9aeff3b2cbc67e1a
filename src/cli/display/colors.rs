//! Status, priority and department color mapping for CLI output.
//!
//! `console` drops styling automatically when stdout is not a terminal or
//! `NO_COLOR` is set.

use console::{style, StyledObject};

use crate::domain::models::{Department, TaskPriority, TaskStatus};

/// Color scheme follows the workflow: sales blue, design magenta,
/// management yellow, production cyan, completed green.
pub fn colorize_status(status: TaskStatus) -> StyledObject<&'static str> {
    let text = status.label();
    match status {
        TaskStatus::New => style(text).white().bold(),
        TaskStatus::InSales => style(text).blue(),
        TaskStatus::InDesign => style(text).magenta(),
        TaskStatus::InManagement => style(text).yellow(),
        TaskStatus::InProduction => style(text).cyan(),
        TaskStatus::Completed => style(text).green().bold(),
    }
}

pub fn colorize_priority(priority: TaskPriority) -> StyledObject<&'static str> {
    let text = priority.label();
    match priority {
        TaskPriority::Urgent => style(text).red().bold(),
        TaskPriority::High => style(text).red(),
        TaskPriority::Medium => style(text).white(),
        TaskPriority::Low => style(text).dim(),
    }
}

pub fn colorize_department(department: Department) -> StyledObject<&'static str> {
    let text = department.label();
    match department {
        Department::Sales => style(text).blue(),
        Department::Design => style(text).magenta(),
        Department::Management => style(text).yellow(),
        Department::Production => style(text).cyan(),
    }
}

/// Dim label used for keys in detail views.
pub fn label(text: &str) -> StyledObject<&str> {
    style(text).dim()
}
