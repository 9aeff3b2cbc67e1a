//! `printflow notify ...` commands.

use anyhow::Result;
use serde::Serialize;

use crate::cli::context::{CliContext, Identity};
use crate::cli::display::{action_success, count_label, notification_table, output, render_list, CommandOutput};
use crate::cli::id_resolver::resolve_notification_id;
use crate::cli::types::NotifyCommands;
use crate::domain::models::Notification;

#[derive(Debug, Serialize)]
pub struct NotificationListOutput {
    pub user_id: String,
    pub unread: u64,
    pub notifications: Vec<Notification>,
}

impl CommandOutput for NotificationListOutput {
    fn to_human(&self) -> String {
        format!(
            "{} unread\n{}",
            count_label(self.unread as usize, "notification", "notifications"),
            render_list(
                "notification",
                &notification_table(&self.notifications),
                self.notifications.len()
            )
        )
    }
}

#[derive(Debug, Serialize)]
pub struct NotifyActionOutput {
    pub message: String,
    pub affected: u64,
}

impl CommandOutput for NotifyActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(command: NotifyCommands, ctx: &CliContext, identity: &Identity, json: bool) -> Result<()> {
    match command {
        NotifyCommands::List { unread } => {
            let user_id = identity.user_id()?;
            let notifications = ctx.notifications.list(&user_id, unread).await?;
            let unread = ctx.notifications.unread_count(&user_id).await?;
            output(
                &NotificationListOutput {
                    user_id,
                    unread,
                    notifications,
                },
                json,
            );
        }

        NotifyCommands::Read { id } => {
            let user_id = identity.user_id()?;
            let notification_id = resolve_notification_id(&ctx.pool, &id, &user_id).await?;
            let notification = ctx.notifications.mark_as_read(notification_id, &user_id).await?;
            output(
                &NotifyActionOutput {
                    message: format!("Read: {}", notification.message),
                    affected: 1,
                },
                json,
            );
        }

        NotifyCommands::ReadAll => {
            let user_id = identity.user_id()?;
            let affected = ctx.notifications.mark_all_as_read(&user_id).await?;
            output(
                &NotifyActionOutput {
                    message: format!(
                        "Marked {} read",
                        count_label(affected as usize, "notification", "notifications")
                    ),
                    affected,
                },
                json,
            );
        }

        NotifyCommands::Sync => {
            let created = ctx.notifications.reconcile_since(None).await?;
            output(
                &NotifyActionOutput {
                    message: format!(
                        "Derived {}",
                        count_label(created, "missing notification", "missing notifications")
                    ),
                    affected: created as u64,
                },
                json,
            );
        }
    }

    Ok(())
}
