//! In-memory adapters for tests and embedding without a database.

pub mod notification_repository;
pub mod task_repository;

pub use notification_repository::InMemoryNotificationRepository;
pub use task_repository::InMemoryTaskRepository;
