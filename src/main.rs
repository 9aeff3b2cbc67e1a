//! Printflow CLI entry point.

use anyhow::Result;
use clap::Parser;

use printflow::cli::commands::{init, notify, queue, task};
use printflow::cli::{CliContext, Cli, Commands, Identity};
use printflow::infrastructure::config::ConfigLoader;
use printflow::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        printflow::cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        command,
        json,
        config,
        user,
        department,
    } = cli;

    let config = match config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    if let Commands::Init { force } = command {
        return init::execute(force, json).await;
    }

    let identity = Identity::new(user, department);
    let ctx = CliContext::open(config).await?;

    let result = match command {
        Commands::Task(cmd) => task::execute(cmd, &ctx, &identity, json).await,
        Commands::Queue { status, search } => queue::execute_queue(&ctx, &identity, status, search, json).await,
        Commands::Dashboard => queue::execute_dashboard(&ctx, &identity, json).await,
        Commands::Notify(cmd) => notify::execute(cmd, &ctx, &identity, json).await,
        Commands::Init { .. } => Ok(()),
    };

    ctx.close().await;
    result
}
