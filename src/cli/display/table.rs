//! Table builder wrapper around comfy-table for consistent list display.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::style;

use super::colors::{colorize_priority, colorize_status};
use super::format::{short_id, timestamp, truncate};
use crate::domain::models::{Notification, Task};

/// Standard list table with the given headers and no borders.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render the table with a count header, or a "No ... found." line.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{} {}:\n{}", style(total).bold(), noun, table)
}

pub fn task_table(tasks: &[Task]) -> Table {
    let mut table = list_table(&["id", "title", "client", "status", "priority", "assigned", "updated"]);
    for task in tasks {
        table.add_row(vec![
            Cell::new(short_id(&task.id)),
            Cell::new(truncate(&task.title, 32)),
            Cell::new(truncate(&task.client_name, 20)),
            Cell::new(colorize_status(task.status)),
            Cell::new(colorize_priority(task.priority)),
            Cell::new(task.assigned_to.as_deref().unwrap_or("-")),
            Cell::new(timestamp(&task.updated_at)),
        ]);
    }
    table
}

pub fn notification_table(notifications: &[Notification]) -> Table {
    let mut table = list_table(&["id", "", "message", "created"]);
    for n in notifications {
        let marker = if n.read { style("").dim() } else { style("\u{25cf}").cyan().bold() };
        table.add_row(vec![
            Cell::new(short_id(&n.id)),
            Cell::new(marker),
            Cell::new(truncate(&n.message, 60)),
            Cell::new(timestamp(&n.created_at)),
        ]);
    }
    table
}
