//! Service layer: the workflow engine, the comment/attachment ledger, the
//! notification deriver and the in-process event bus that connects them.

pub mod event_bus;
pub mod notification_deriver;
pub mod retry;
pub mod task_ledger;
pub mod task_query;
pub mod workflow_engine;

pub use event_bus::{
    BusMessage, EventBus, EventBusConfig, EventCategory, EventFilter, EventId, EventPayload,
    SequenceNumber, TaskLogEvent, UnifiedEvent,
};
pub use notification_deriver::{recipient_for, DeriverHandle, NotificationDeriver};
pub use retry::RetryPolicy;
pub use task_ledger::TaskLedger;
pub use task_query::{queue_filter, DashboardSummary, StatusCount, TaskQueryService};
pub use workflow_engine::{TaskLockGuard, TaskLocks, WorkflowEngine};
