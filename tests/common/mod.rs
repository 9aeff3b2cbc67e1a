//! Common test utilities for integration tests
//!
//! Shared fixtures: acting users per department, task inputs and
//! repository setups for both storage backends.

#![allow(dead_code)]

use std::sync::Arc;

use printflow::adapters::memory::{InMemoryNotificationRepository, InMemoryTaskRepository};
use printflow::adapters::sqlite::{
    create_migrated_test_pool, SqliteNotificationRepository, SqliteTaskRepository,
};
use printflow::domain::models::{Actor, Department, NewTask, TaskPriority};
use printflow::services::{EventBus, EventBusConfig};

pub const SALES_USER: &str = "sales-u1";
pub const DESIGN_USER: &str = "design-u2";
pub const MANAGEMENT_USER: &str = "mgmt-u3";
pub const PRODUCTION_USER: &str = "prod-u4";

pub fn sales() -> Actor {
    Actor::new(SALES_USER, Department::Sales)
}

pub fn design() -> Actor {
    Actor::new(DESIGN_USER, Department::Design)
}

pub fn management() -> Actor {
    Actor::new(MANAGEMENT_USER, Department::Management)
}

pub fn production() -> Actor {
    Actor::new(PRODUCTION_USER, Department::Production)
}

pub fn brochure() -> NewTask {
    NewTask::new("Spring brochure", "16 pages, A4, matte", "Green Valley Farms")
        .with_priority(TaskPriority::High)
}

pub fn bus() -> Arc<EventBus> {
    Arc::new(EventBus::new(EventBusConfig::default()))
}

pub async fn sqlite_repos() -> (Arc<SqliteTaskRepository>, Arc<SqliteNotificationRepository>) {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create migrated test pool");
    (
        Arc::new(SqliteTaskRepository::new(pool.clone())),
        Arc::new(SqliteNotificationRepository::new(pool)),
    )
}

pub fn memory_repos() -> (Arc<InMemoryTaskRepository>, Arc<InMemoryNotificationRepository>) {
    (
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(InMemoryNotificationRepository::new()),
    )
}

/// Initializes a tracing subscriber that writes through the test harness.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
