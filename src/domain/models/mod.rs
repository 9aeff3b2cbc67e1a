pub mod config;
pub mod department;
pub mod notification;
pub mod policy;
pub mod task;

pub use config::{Config, DatabaseConfig, EventsConfig, LoggingConfig, RetryConfig, StorageConfig};
pub use department::{Actor, Department};
pub use notification::Notification;
pub use policy::{allowed_next_statuses, is_transition_allowed, statuses_owned_by, TransitionRule};
pub use task::{
    ACTION_ASSIGNED, ACTION_CREATED, ACTION_STATUS_CHANGED,
    FileMetadata, NewTask, Task, TaskComment, TaskFile, TaskLog, TaskPatch, TaskPriority,
    TaskStatus, UserId,
};
