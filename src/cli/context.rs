//! Service wiring for a single CLI invocation.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

use crate::adapters::blob::LocalBlobStore;
use crate::adapters::sqlite::{
    database_url, initialize_database, PoolConfig, SqliteNotificationRepository, SqliteTaskRepository,
};
use crate::domain::models::{Actor, Config, Department};
use crate::services::{
    DeriverHandle, EventBus, EventBusConfig, NotificationDeriver, RetryPolicy, TaskLedger,
    TaskQueryService, WorkflowEngine,
};

pub type Deriver = NotificationDeriver<SqliteTaskRepository, SqliteNotificationRepository>;

/// Services backed by the configured SQLite database and blob directory.
///
/// A notification deriver runs for the lifetime of the context; call
/// [`CliContext::close`] so it drains before the process exits.
pub struct CliContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub bus: Arc<EventBus>,
    pub engine: WorkflowEngine<SqliteTaskRepository>,
    pub ledger: TaskLedger<SqliteTaskRepository, LocalBlobStore>,
    pub queries: TaskQueryService<SqliteTaskRepository>,
    pub notifications: Arc<Deriver>,
    pub retry: RetryPolicy,
    deriver: DeriverHandle,
}

impl CliContext {
    pub async fn open(config: Config) -> Result<Self> {
        let url = database_url(&config.database.path);
        let pool = initialize_database(&url, Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;

        let bus = Arc::new(EventBus::new(EventBusConfig::from(&config.events)));
        let tasks = Arc::new(SqliteTaskRepository::new(pool.clone()));
        let notification_repo = Arc::new(SqliteNotificationRepository::new(pool.clone()));
        let blobs = Arc::new(LocalBlobStore::new(&config.storage.blob_dir));

        let retry = RetryPolicy::from(&config.retry);
        // bounded by config validation
        let margin = chrono::Duration::seconds(config.events.reconcile_margin_secs as i64);
        let notifications = Arc::new(
            NotificationDeriver::new(tasks.clone(), notification_repo, bus.clone())
                .with_retry(retry.clone())
                .with_reconcile_margin(margin),
        );
        let deriver = notifications.clone().spawn(bus.subscribe());

        debug!(database = %config.database.path, "cli context ready");

        Ok(Self {
            retry,
            engine: WorkflowEngine::new(tasks.clone(), bus.clone()),
            ledger: TaskLedger::new(tasks.clone(), blobs, bus.clone()),
            queries: TaskQueryService::new(tasks),
            notifications,
            deriver,
            bus,
            pool,
            config,
        })
    }

    /// Drain pending notification work and close the pool.
    pub async fn close(self) {
        self.deriver.shutdown().await;
        self.pool.close().await;
    }
}

/// Who is running the command, from `--user` / `--department`.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub user: Option<String>,
    pub department: Option<String>,
}

impl Identity {
    pub fn new(user: Option<String>, department: Option<String>) -> Self {
        Self { user, department }
    }

    /// The acting user id alone, for commands that are not department-gated.
    pub fn user_id(&self) -> Result<String> {
        self.user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No user given. Pass --user or set PRINTFLOW_USER"))
    }

    pub fn department(&self) -> Result<Department> {
        let department = self
            .department
            .as_deref()
            .ok_or_else(|| anyhow!("No department given. Pass --department or set PRINTFLOW_DEPARTMENT"))?;
        Department::from_str(department).ok_or_else(|| {
            anyhow!("Unknown department '{department}'. Expected one of: sales, design, management, production")
        })
    }

    pub fn actor(&self) -> Result<Actor> {
        Ok(Actor::new(self.user_id()?, self.department()?))
    }
}
