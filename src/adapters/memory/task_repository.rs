//! In-memory implementation of the TaskRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskPatch};
use crate::domain::ports::{TaskFilter, TaskRepository};

/// Tasks held in a map behind one lock; each patch runs under the write
/// guard so check-and-apply is atomic.
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(DomainError::Storage(format!("Task {} already exists", task.id)));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update_atomic(
        &self,
        id: Uuid,
        expected_version: Option<u64>,
        patch: TaskPatch,
    ) -> DomainResult<Task> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks.get(&id).ok_or(DomainError::TaskNotFound(id))?;

        if patch.requires_version() {
            let expected = expected_version.ok_or_else(|| {
                DomainError::Validation(format!("{} requires an expected version", patch.kind()))
            })?;
            if stored.version != expected {
                return Err(DomainError::Conflict { task_id: id, expected_version: expected });
            }
        }

        // Work on a copy so a rejected patch leaves the stored task untouched.
        let mut updated = stored.clone();
        updated.apply(patch)?;
        tasks.insert(id, updated.clone());
        Ok(updated)
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut result: Vec<Task> = tasks.values().filter(|t| filter.matches(t)).cloned().collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{NewTask, TaskLog, TaskStatus};

    #[tokio::test]
    async fn test_conflict_leaves_task_untouched() {
        let repo = InMemoryTaskRepository::new();
        let task = Task::create(NewTask::new("Sticker", "round 5cm", "Oasis"), "s").unwrap();
        repo.create(&task).await.unwrap();

        let log = TaskLog::status_change(TaskStatus::New, TaskStatus::InDesign, "s", None);
        let err = repo
            .update_atomic(task.id, Some(7), TaskPatch::Transition { log })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
        assert_eq!(repo.get(task.id).await.unwrap().unwrap(), task);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let repo = InMemoryTaskRepository::new();
        let task = Task::create(NewTask::new("Sticker", "round 5cm", "Oasis"), "s").unwrap();
        repo.create(&task).await.unwrap();
        assert!(repo.create(&task).await.is_err());
    }
}
