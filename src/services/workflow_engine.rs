//! Workflow engine: task creation, department-gated transitions and
//! reassignment.
//!
//! Every status change goes through the transition policy, is committed as a
//! single atomic patch (status + log entry, guarded by the task version) and
//! is then published on the event bus. A per-task lock spans load, commit and
//! publish so that events for one task leave this process in append order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    allowed_next_statuses, Actor, NewTask, Task, TaskLog, TaskPatch, TaskStatus,
};
use crate::domain::ports::TaskRepository;
use crate::services::event_bus::{EventBus, EventPayload, TaskLogEvent};

#[derive(Debug, Default)]
struct LockEntry {
    lock: Arc<Mutex<()>>,
    /// Holders plus waiters
    users: usize,
}

/// Per-task async locks, created on demand and dropped once idle.
#[derive(Debug, Default)]
pub struct TaskLocks {
    locks: SyncMutex<HashMap<Uuid, LockEntry>>,
}

impl TaskLocks {
    /// Wait for the lock of `task_id`. Dropping the returned guard, or the
    /// future while it still waits, releases the entry.
    pub async fn acquire(&self, task_id: Uuid) -> TaskLockGuard<'_> {
        let lock = {
            let mut locks = self.entries();
            let entry = locks.entry(task_id).or_default();
            entry.users += 1;
            entry.lock.clone()
        };
        let mut guard = TaskLockGuard {
            locks: self,
            task_id,
            held: None,
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    /// Tasks with a holder or a waiter.
    pub fn active_count(&self) -> usize {
        self.entries().len()
    }

    // The map is only touched in short synchronous sections, never across
    // an await, so a poisoned lock still holds a consistent map.
    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, LockEntry>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds one task's lock; forgets the map entry when the last user leaves.
pub struct TaskLockGuard<'a> {
    locks: &'a TaskLocks,
    task_id: Uuid,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for TaskLockGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut locks = self.locks.entries();
        if let Some(entry) = locks.get_mut(&self.task_id) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                locks.remove(&self.task_id);
            }
        }
    }
}

pub struct WorkflowEngine<T: TaskRepository> {
    repo: Arc<T>,
    bus: Arc<EventBus>,
    locks: TaskLocks,
}

impl<T: TaskRepository> WorkflowEngine<T> {
    pub fn new(repo: Arc<T>, bus: Arc<EventBus>) -> Self {
        Self {
            repo,
            bus,
            locks: TaskLocks::default(),
        }
    }

    /// Create a task in status `new` with its creation log entry.
    ///
    /// Which departments may create tasks is decided by the caller.
    #[instrument(skip(self, input), fields(actor = %actor.user_id, department = %actor.department))]
    pub async fn create_task(&self, input: NewTask, actor: &Actor) -> DomainResult<Task> {
        actor.validate()?;
        let task = Task::create(input, actor.user_id.clone())?;

        self.repo.create(&task).await?;

        if let Some(log) = task.creation_log() {
            self.bus
                .publish_payload(EventPayload::LogAppended(TaskLogEvent::new(&task, log.clone())));
        }

        info!(task_id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    /// Move a task to `target` on behalf of `actor`.
    ///
    /// Fails with `ForbiddenTransition` when the actor's department may not
    /// reach `target` from the current status, and with `Conflict` when
    /// another writer committed in between.
    #[instrument(skip(self, comment), fields(actor = %actor.user_id, department = %actor.department))]
    pub async fn transition(
        &self,
        task_id: Uuid,
        target: TaskStatus,
        actor: &Actor,
        comment: Option<String>,
    ) -> DomainResult<Task> {
        actor.validate()?;

        let _guard = self.locks.acquire(task_id).await;
        self.transition_locked(task_id, target, actor, comment).await
    }

    async fn transition_locked(
        &self,
        task_id: Uuid,
        target: TaskStatus,
        actor: &Actor,
        comment: Option<String>,
    ) -> DomainResult<Task> {
        let task = self.load(task_id).await?;
        let from = task.status;

        if !allowed_next_statuses(from, actor.department).contains(&target) {
            warn!(%task_id, %from, to = %target, "transition rejected by policy");
            return Err(DomainError::ForbiddenTransition {
                from,
                to: target,
                department: actor.department,
            });
        }

        let log = TaskLog::status_change(from, target, actor.user_id.clone(), comment);
        let updated = self
            .repo
            .update_atomic(task_id, Some(task.version), TaskPatch::Transition { log: log.clone() })
            .await?;

        self.bus
            .publish_payload(EventPayload::LogAppended(TaskLogEvent::new(&updated, log)));

        info!(%task_id, %from, to = %target, version = updated.version, "task transitioned");
        Ok(updated)
    }

    /// Reassign a task. Not department-gated; the status is unchanged.
    #[instrument(skip(self), fields(actor = %actor.user_id, department = %actor.department))]
    pub async fn assign(&self, task_id: Uuid, assignee: &str, actor: &Actor) -> DomainResult<Task> {
        actor.validate()?;
        let assignee = assignee.trim();
        if assignee.is_empty() {
            return Err(DomainError::validation("Assignee cannot be empty"));
        }

        let _guard = self.locks.acquire(task_id).await;
        self.assign_locked(task_id, assignee, actor).await
    }

    async fn assign_locked(&self, task_id: Uuid, assignee: &str, actor: &Actor) -> DomainResult<Task> {
        let task = self.load(task_id).await?;
        if task.is_terminal() {
            return Err(DomainError::Validation(format!(
                "Task {task_id} is completed and can no longer be reassigned"
            )));
        }

        let log = TaskLog::assigned(actor.user_id.clone(), assignee);
        let patch = TaskPatch::Assign {
            assignee: assignee.to_string(),
            log: log.clone(),
        };
        let updated = self.repo.update_atomic(task_id, Some(task.version), patch).await?;

        self.bus
            .publish_payload(EventPayload::LogAppended(TaskLogEvent::new(&updated, log)));

        info!(%task_id, %assignee, version = updated.version, "task assigned");
        Ok(updated)
    }

    /// Statuses `actor` may move the task to right now.
    pub async fn allowed_transitions(&self, task_id: Uuid, actor: &Actor) -> DomainResult<Vec<TaskStatus>> {
        let task = self.load(task_id).await?;
        Ok(allowed_next_statuses(task.status, actor.department).to_vec())
    }

    pub async fn get_task(&self, task_id: Uuid) -> DomainResult<Task> {
        self.load(task_id).await
    }

    /// The ordered audit trail of a task.
    pub async fn history(&self, task_id: Uuid) -> DomainResult<Vec<TaskLog>> {
        Ok(self.load(task_id).await?.logs)
    }

    async fn load(&self, task_id: Uuid) -> DomainResult<Task> {
        let task = self.repo.get(task_id).await?;
        debug!(%task_id, found = task.is_some(), "loaded task");
        task.ok_or(DomainError::TaskNotFound(task_id))
    }
}
