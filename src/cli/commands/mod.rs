//! CLI command implementations.

pub mod init;
pub mod notify;
pub mod queue;
pub mod task;

use anyhow::{anyhow, Result};

use crate::domain::models::{TaskPriority, TaskStatus};

pub(crate) fn parse_status(s: &str) -> Result<TaskStatus> {
    TaskStatus::from_str(s).ok_or_else(|| {
        anyhow!("Unknown status '{s}'. Expected one of: new, in_sales, in_design, in_management, in_production, completed")
    })
}

pub(crate) fn parse_priority(s: &str) -> Result<TaskPriority> {
    TaskPriority::from_str(s)
        .ok_or_else(|| anyhow!("Unknown priority '{s}'. Expected one of: low, medium, high, urgent"))
}
