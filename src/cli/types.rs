//! CLI type definitions
//!
//! Clap command structures that define the command-line interface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "printflow")]
#[command(about = "Printflow - department-gated print job workflow", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .printflow/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Acting user id
    #[arg(long, global = true, env = "PRINTFLOW_USER")]
    pub user: Option<String>,

    /// Acting department: sales, design, management or production
    #[arg(long, global = true, env = "PRINTFLOW_DEPARTMENT")]
    pub department: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and database in .printflow/
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Task management commands
    #[command(subcommand)]
    Task(TaskCommands),

    /// Tasks your department works on
    Queue {
        /// Only tasks in this status
        #[arg(short, long)]
        status: Option<String>,

        /// Case-insensitive text over title, description and client
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Queue overview: counts, urgency and completion rate
    Dashboard,

    /// Notification commands
    #[command(subcommand)]
    Notify(NotifyCommands),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task in status `new`
    Create {
        /// Task title
        title: String,

        #[arg(short, long)]
        description: String,

        /// Client name
        #[arg(short, long)]
        client: String,

        /// low, medium, high or urgent
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,

        /// Initial assignee
        #[arg(short, long)]
        assignee: Option<String>,
    },

    /// Show task details
    Show {
        /// Task ID or unique prefix
        id: String,
    },

    /// List tasks across all departments
    List {
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(long)]
        assigned_to: Option<String>,

        #[arg(long)]
        created_by: Option<String>,

        #[arg(short = 'q', long)]
        search: Option<String>,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Move a task to another status
    Transition {
        /// Task ID or unique prefix
        id: String,

        /// Target status
        to: String,

        #[arg(short, long)]
        comment: Option<String>,

        /// Reload and resubmit when another writer got there first
        #[arg(long)]
        retry: bool,
    },

    /// Reassign a task
    Assign {
        /// Task ID or unique prefix
        id: String,

        assignee: String,
    },

    /// Add a comment
    Comment {
        /// Task ID or unique prefix
        id: String,

        text: String,
    },

    /// Attach a file
    Attach {
        /// Task ID or unique prefix
        id: String,

        path: PathBuf,

        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Show the audit trail
    History {
        /// Task ID or unique prefix
        id: String,
    },

    /// Statuses you may move the task to
    Allowed {
        /// Task ID or unique prefix
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// List your notifications
    List {
        /// Only unread notifications
        #[arg(short, long)]
        unread: bool,
    },

    /// Mark one notification read
    Read {
        /// Notification ID or unique prefix
        id: String,
    },

    /// Mark all notifications read
    ReadAll,

    /// Re-derive notifications for every task
    Sync,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_transition() {
        let cli = Cli::try_parse_from([
            "printflow", "--user", "d1", "--department", "design", "task", "transition", "abc123",
            "in_management", "-c", "proof ok",
        ])
        .unwrap();

        assert_eq!(cli.user.as_deref(), Some("d1"));
        match cli.command {
            Commands::Task(TaskCommands::Transition { id, to, comment, retry }) => {
                assert_eq!(id, "abc123");
                assert_eq!(to, "in_management");
                assert_eq!(comment.as_deref(), Some("proof ok"));
                assert!(!retry);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_due_date() {
        let cli = Cli::try_parse_from([
            "printflow", "task", "create", "Poster", "-d", "A2", "-c", "Gym", "--due", "2026-11-30",
        ])
        .unwrap();
        match cli.command {
            Commands::Task(TaskCommands::Create { due, priority, .. }) => {
                assert_eq!(due, NaiveDate::from_ymd_opt(2026, 11, 30));
                assert_eq!(priority, "medium");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
