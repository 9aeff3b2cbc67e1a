//! Read-side queries: department queues, search and the dashboard summary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{statuses_owned_by, Department, Task, TaskStatus};
use crate::domain::ports::{TaskFilter, TaskRepository};

/// How many recently updated tasks the dashboard shows.
pub const RECENT_TASKS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: usize,
}

/// Per-department overview of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub department: Department,
    pub total: usize,
    /// One entry per status, in workflow order
    pub by_status: Vec<StatusCount>,
    /// High or urgent priority
    pub urgent: usize,
    /// Picked up but not completed: anything past `new`
    pub in_progress: usize,
    pub completed: usize,
    /// Rounded percentage of completed tasks, 0 when the queue is empty
    pub completion_rate: u32,
    pub recent: Vec<Task>,
}

impl DashboardSummary {
    pub fn from_tasks(department: Department, tasks: Vec<Task>) -> Self {
        let total = tasks.len();
        let by_status = TaskStatus::ALL
            .iter()
            .map(|&status| StatusCount {
                status,
                count: tasks.iter().filter(|t| t.status == status).count(),
            })
            .collect();
        let urgent = tasks.iter().filter(|t| t.priority.is_pressing()).count();
        let completed = tasks.iter().filter(|t| t.is_terminal()).count();
        let in_progress = tasks
            .iter()
            .filter(|t| t.status != TaskStatus::New && !t.is_terminal())
            .count();

        let mut recent = tasks;
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        recent.truncate(RECENT_TASKS);

        Self {
            department,
            total,
            by_status,
            urgent,
            in_progress,
            completed,
            completion_rate: completion_rate(completed, total),
            recent,
        }
    }

    /// Tasks in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.by_status
            .iter()
            .find(|c| c.status == status)
            .map_or(0, |c| c.count)
    }
}

fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Filter describing the tasks a department works on.
///
/// Sales sees what it created, the other departments what is assigned to
/// the user, plus every task sitting in a status the department owns.
pub fn queue_filter(department: Department, user_id: &str) -> TaskFilter {
    let mut filter = TaskFilter {
        statuses: statuses_owned_by(department).to_vec(),
        ..TaskFilter::default()
    };
    match department {
        Department::Sales => filter.created_by = Some(user_id.to_string()),
        Department::Design | Department::Management | Department::Production => {
            filter.assigned_to = Some(user_id.to_string());
        }
    }
    filter
}

pub struct TaskQueryService<T: TaskRepository> {
    repo: Arc<T>,
}

impl<T: TaskRepository> TaskQueryService<T> {
    pub fn new(repo: Arc<T>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn department_queue(&self, department: Department, user_id: &str) -> DomainResult<Vec<Task>> {
        let tasks = self.repo.list(queue_filter(department, user_id)).await?;
        debug!(count = tasks.len(), "department queue loaded");
        Ok(tasks)
    }

    /// The department queue narrowed by status and free text.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        department: Department,
        user_id: &str,
        status: Option<TaskStatus>,
        query: Option<&str>,
    ) -> DomainResult<Vec<Task>> {
        let mut filter = queue_filter(department, user_id);
        filter.status = status;
        filter.search = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        self.repo.list(filter).await
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self, department: Department, user_id: &str) -> DomainResult<DashboardSummary> {
        let tasks = self.department_queue(department, user_id).await?;
        Ok(DashboardSummary::from_tasks(department, tasks))
    }

    /// Unscoped listing, used by administrative views.
    pub async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        self.repo.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryTaskRepository;
    use crate::domain::models::{NewTask, TaskLog, TaskPatch, TaskPriority};

    async fn seed(repo: &InMemoryTaskRepository, title: &str, creator: &str, priority: TaskPriority) -> Task {
        let task = Task::create(
            NewTask::new(title, "details", "Client").with_priority(priority),
            creator,
        )
        .unwrap();
        repo.create(&task).await.unwrap();
        task
    }

    async fn move_to(repo: &InMemoryTaskRepository, task: &Task, to: TaskStatus) -> Task {
        let log = TaskLog::status_change(task.status, to, "tester", None);
        repo.update_atomic(task.id, Some(task.version), TaskPatch::Transition { log })
            .await
            .unwrap()
    }

    #[test]
    fn test_queue_filter_per_department() {
        let sales = queue_filter(Department::Sales, "s1");
        assert_eq!(sales.statuses, vec![TaskStatus::New, TaskStatus::InSales]);
        assert_eq!(sales.created_by.as_deref(), Some("s1"));
        assert!(sales.assigned_to.is_none());

        let design = queue_filter(Department::Design, "d1");
        assert_eq!(design.statuses, vec![TaskStatus::InDesign]);
        assert_eq!(design.assigned_to.as_deref(), Some("d1"));
        assert!(design.created_by.is_none());
    }

    #[test]
    fn test_completion_rate_rounding() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(4, 4), 100);
    }

    #[tokio::test]
    async fn test_department_queue_and_search() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let flyer = seed(&repo, "Flyer", "s1", TaskPriority::Low).await;
        let banner = seed(&repo, "Banner", "s2", TaskPriority::High).await;
        move_to(&repo, &banner, TaskStatus::InDesign).await;

        let queries = TaskQueryService::new(repo.clone());

        // s1 created the flyer; the banner left sales for design.
        let sales = queries.department_queue(Department::Sales, "s1").await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].id, flyer.id);

        let design = queries.department_queue(Department::Design, "d1").await.unwrap();
        assert_eq!(design.len(), 1);
        assert_eq!(design[0].id, banner.id);

        let found = queries
            .search(Department::Design, "d1", None, Some("  BAN "))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        let none = queries
            .search(Department::Design, "d1", Some(TaskStatus::InSales), None)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_summary() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        seed(&repo, "One", "s1", TaskPriority::Urgent).await;
        seed(&repo, "Two", "s1", TaskPriority::Medium).await;
        let three = seed(&repo, "Three", "s1", TaskPriority::High).await;
        seed(&repo, "Four", "s1", TaskPriority::Low).await;
        let three = move_to(&repo, &three, TaskStatus::InDesign).await;

        let summary = TaskQueryService::new(repo)
            .dashboard(Department::Sales, "s1")
            .await
            .unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.count(TaskStatus::New), 3);
        assert_eq!(summary.count(TaskStatus::InDesign), 1);
        assert_eq!(summary.urgent, 2);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.completion_rate, 0);
        assert_eq!(summary.recent.len(), RECENT_TASKS);
        assert_eq!(summary.recent[0].id, three.id);
    }

    #[tokio::test]
    async fn test_in_progress_excludes_new_and_completed() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let fresh = seed(&repo, "Fresh", "s1", TaskPriority::Low).await;
        let mut done = seed(&repo, "Done", "s1", TaskPriority::Low).await;
        for to in [
            TaskStatus::InDesign,
            TaskStatus::InManagement,
            TaskStatus::InProduction,
            TaskStatus::Completed,
        ] {
            done = move_to(&repo, &done, to).await;
        }
        let sales = seed(&repo, "Quote", "s1", TaskPriority::Low).await;
        move_to(&repo, &sales, TaskStatus::InSales).await;

        let summary = TaskQueryService::new(repo)
            .dashboard(Department::Sales, "s1")
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.count(TaskStatus::New), 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.completion_rate, 33);
        assert!(summary.recent.iter().any(|t| t.id == fresh.id));
    }
}
