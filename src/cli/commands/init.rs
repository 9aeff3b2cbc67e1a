//! Implementation of the `printflow init` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::fs;

use crate::adapters::sqlite::{database_url, initialize_database};
use crate::cli::display::{action_failure, action_success, output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::{ConfigLoader, CONFIG_DIR};

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let headline = if self.success {
            action_success(&self.message)
        } else {
            action_failure(&self.message)
        };
        let mut lines = vec![headline];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push(format!("\nWrote {CONFIG_DIR}/config.yaml"));
        }
        if self.database_initialized {
            lines.push(format!("Database ready at {}", Config::default().database.path));
        }
        lines.join("\n")
    }
}

pub async fn execute(force: bool, json_mode: bool) -> Result<()> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    let result = init_in(&root, force).await?;
    output(&result, json_mode);
    Ok(())
}

/// Set up `.printflow/` under `root`: directories, default config and a
/// migrated database.
///
/// A second run without `force` changes nothing. With `force` the config
/// file is rewritten; tasks, notifications and attachments are kept.
pub async fn init_in(root: &Path, force: bool) -> Result<InitOutput> {
    let config_dir = root.join(CONFIG_DIR);
    let config_path = config_dir.join("config.yaml");

    if config_path.exists() && !force {
        return Ok(InitOutput {
            success: false,
            message: "Project already initialized. Use --force to rewrite the config.".to_string(),
            initialized_path: root.to_path_buf(),
            directories_created: vec![],
            config_written: false,
            database_initialized: false,
        });
    }

    let defaults = Config::default();
    let mut directories_created = vec![];
    for dir in [config_dir.clone(), root.join(&defaults.storage.blob_dir)] {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let relative = dir.strip_prefix(root).unwrap_or(&dir).to_string_lossy().to_string();
            directories_created.push(relative);
        }
    }

    fs::write(&config_path, ConfigLoader::default_yaml()?)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let db_path = root.join(&defaults.database.path);
    let pool = initialize_database(&database_url(&db_path.to_string_lossy()), None)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    Ok(InitOutput {
        success: true,
        message: if force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: root.to_path_buf(),
        directories_created,
        config_written: true,
        database_initialized: true,
    })
}
