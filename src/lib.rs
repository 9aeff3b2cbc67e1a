//! Printflow - department-gated task workflow engine
//!
//! Print jobs move through sales, design, management and production. Every
//! status change is checked against a per-department transition policy,
//! committed together with an append-only audit log entry, and turned into
//! per-user notifications by an asynchronous deriver.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, the transition policy, errors and
//!   the repository ports
//! - **Adapters** (`adapters`): SQLite and in-memory repositories, blob storage
//! - **Service Layer** (`services`): workflow engine, comment/file ledger,
//!   notification deriver, event bus and read-side queries
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use printflow::adapters::memory::InMemoryTaskRepository;
//! use printflow::domain::models::{Actor, Department, NewTask, TaskStatus};
//! use printflow::services::{EventBus, WorkflowEngine};
//!
//! let engine = WorkflowEngine::new(Arc::new(InMemoryTaskRepository::new()), Arc::new(EventBus::default()));
//! let sales = Actor::new("sales-1", Department::Sales);
//! let task = engine.create_task(NewTask::new("Flyer", "A5, 250gsm", "Cafe"), &sales).await?;
//! engine.transition(task.id, TaskStatus::InDesign, &sales, None).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult, ErrorKind};
pub use domain::models::{
    Actor, Config, Department, NewTask, Notification, Task, TaskLog, TaskPriority, TaskStatus,
};
pub use domain::ports::{BlobStore, NotificationRepository, TaskFilter, TaskRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EventBus, NotificationDeriver, TaskLedger, TaskQueryService, WorkflowEngine};
