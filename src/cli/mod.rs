//! Command-line interface.

pub mod commands;
pub mod context;
pub mod display;
pub mod id_resolver;
pub mod types;

use console::style;

pub use context::{CliContext, Identity};
pub use types::{Cli, Commands, NotifyCommands, TaskCommands};

use crate::domain::errors::DomainError;

/// Stable error label for scripts: the domain error kind when there is one.
pub fn error_kind_label(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DomainError>())
        .map_or("error", |e| e.kind().as_str())
}

/// Print `err` and exit with a non-zero status.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    let kind = error_kind_label(&err);
    if json {
        let body = serde_json::json!({
            "error": kind,
            "message": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {}: {err:#}", style("error").red().bold(), style(kind).dim());
    }
    std::process::exit(1);
}
