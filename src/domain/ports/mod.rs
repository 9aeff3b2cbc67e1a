//! Port trait definitions (Hexagonal Architecture)
//!
//! Storage contracts the workflow services depend on:
//! - TaskRepository: task aggregate persistence with atomic patches
//! - NotificationRepository: derived notifications with dedupe on source log
//! - BlobStore: attachment bytes

pub mod blob_store;
pub mod notification_repository;
pub mod task_repository;

pub use blob_store::BlobStore;
pub use notification_repository::NotificationRepository;
pub use task_repository::{TaskFilter, TaskRepository};
