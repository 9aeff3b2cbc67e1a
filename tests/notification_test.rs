//! Notification derivation, dedupe and read tracking on SQLite storage.

mod common;

use std::sync::Arc;

use printflow::adapters::memory::InMemoryNotificationRepository;
use printflow::adapters::sqlite::{SqliteNotificationRepository, SqliteTaskRepository};
use printflow::domain::errors::ErrorKind;
use printflow::domain::models::TaskStatus;
use printflow::domain::ports::NotificationRepository;
use printflow::services::{NotificationDeriver, TaskLogEvent, WorkflowEngine};
use uuid::Uuid;

use common::*;

type Deriver = NotificationDeriver<SqliteTaskRepository, SqliteNotificationRepository>;

async fn setup() -> (WorkflowEngine<SqliteTaskRepository>, Arc<Deriver>) {
    let (tasks, notifications) = sqlite_repos().await;
    let bus = bus();
    let engine = WorkflowEngine::new(tasks.clone(), bus.clone());
    let deriver = Arc::new(NotificationDeriver::new(tasks, notifications, bus));
    (engine, deriver)
}

#[tokio::test]
async fn test_replayed_event_yields_one_notification() {
    let (engine, deriver) = setup().await;
    let task = engine.create_task(brochure(), &sales()).await.unwrap();
    let event = TaskLogEvent::new(&task, task.logs[0].clone());

    assert!(deriver.handle_event(&event).await.unwrap().is_some());
    assert!(deriver.handle_event(&event).await.unwrap().is_none());
    assert!(deriver.handle_event(&event).await.unwrap().is_none());

    let listed = deriver.list(SALES_USER, false).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].source_log_id, task.logs[0].id);
    assert_eq!(listed[0].task_id, task.id);
    assert!(!listed[0].read);
}

#[tokio::test]
async fn test_backfill_fills_gaps_only() {
    let (engine, deriver) = setup().await;
    let task = engine.create_task(brochure(), &sales()).await.unwrap();
    let task = engine
        .transition(task.id, TaskStatus::InDesign, &sales(), None)
        .await
        .unwrap();

    // Only the first entry was delivered live.
    deriver
        .handle_event(&TaskLogEvent::new(&task, task.logs[0].clone()))
        .await
        .unwrap();

    assert_eq!(deriver.backfill_task(task.id).await.unwrap(), 1);
    assert_eq!(deriver.reconcile_since(None).await.unwrap(), 0);
    assert_eq!(deriver.list(SALES_USER, false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_mark_read_is_idempotent_and_recipient_only() {
    let (engine, deriver) = setup().await;
    let task = engine.create_task(brochure(), &sales()).await.unwrap();
    deriver.backfill_task(task.id).await.unwrap();
    let notification = deriver.list(SALES_USER, true).await.unwrap().remove(0);

    let err = deriver
        .mark_as_read(notification.id, DESIGN_USER)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let first = deriver.mark_as_read(notification.id, SALES_USER).await.unwrap();
    let second = deriver.mark_as_read(notification.id, SALES_USER).await.unwrap();
    assert!(first.read);
    assert!(second.read);
    assert_eq!(deriver.unread_count(SALES_USER).await.unwrap(), 0);

    let err = deriver.mark_as_read(Uuid::new_v4(), SALES_USER).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_mark_all_read_touches_only_the_user() {
    let (engine, deriver) = setup().await;
    let first = engine.create_task(brochure(), &sales()).await.unwrap();
    let second = engine.create_task(brochure(), &sales()).await.unwrap();
    engine.assign(second.id, DESIGN_USER, &sales()).await.unwrap();
    deriver.reconcile_since(None).await.unwrap();

    // Both creations predate any assignee and go to sales; the
    // reassignment goes to design.
    assert_eq!(deriver.unread_count(SALES_USER).await.unwrap(), 2);
    assert_eq!(deriver.unread_count(DESIGN_USER).await.unwrap(), 1);

    assert_eq!(deriver.mark_all_as_read(SALES_USER).await.unwrap(), 2);
    assert_eq!(deriver.mark_all_as_read(SALES_USER).await.unwrap(), 0);
    assert_eq!(deriver.unread_count(SALES_USER).await.unwrap(), 0);
    assert_eq!(deriver.unread_count(DESIGN_USER).await.unwrap(), 1);

    let read = deriver.list(SALES_USER, false).await.unwrap();
    assert!(read.iter().any(|n| n.task_id == first.id));
    assert!(read.iter().all(|n| n.read));
    let unread = deriver.list(DESIGN_USER, true).await.unwrap();
    assert_eq!(unread[0].task_id, second.id);
    assert_eq!(unread[0].message, "assigned - Spring brochure");
}

#[tokio::test]
async fn test_backfill_reaches_the_same_recipients_as_live_delivery() {
    let (tasks, notifications) = sqlite_repos().await;
    let bus = bus();
    let engine = WorkflowEngine::new(tasks.clone(), bus.clone());
    let live = Arc::new(NotificationDeriver::new(tasks.clone(), notifications, bus.clone()));
    let handle = live.clone().spawn(bus.subscribe());

    let task = engine.create_task(brochure(), &sales()).await.unwrap();
    engine.assign(task.id, DESIGN_USER, &sales()).await.unwrap();
    let task = engine.transition(task.id, TaskStatus::InDesign, &sales(), None).await.unwrap();
    engine.transition(task.id, TaskStatus::InManagement, &design(), None).await.unwrap();
    handle.shutdown().await;

    let rebuilt = NotificationDeriver::new(tasks, Arc::new(InMemoryNotificationRepository::new()), bus);
    assert_eq!(rebuilt.backfill_task(task.id).await.unwrap(), 4);

    for user in [SALES_USER, DESIGN_USER] {
        let mut live_sources: Vec<Uuid> =
            live.list(user, false).await.unwrap().into_iter().map(|n| n.source_log_id).collect();
        let mut rebuilt_sources: Vec<Uuid> =
            rebuilt.list(user, false).await.unwrap().into_iter().map(|n| n.source_log_id).collect();
        live_sources.sort();
        rebuilt_sources.sort();
        assert_eq!(live_sources, rebuilt_sources, "recipients differ for {user}");
    }
    // creation and design's own transition go to sales
    assert_eq!(rebuilt.unread_count(SALES_USER).await.unwrap(), 2);
    assert_eq!(rebuilt.unread_count(DESIGN_USER).await.unwrap(), 2);
}

#[tokio::test]
async fn test_mark_all_read_spares_notifications_stored_after_watermark() {
    let (tasks, notifications) = sqlite_repos().await;
    let bus = bus();
    let engine = WorkflowEngine::new(tasks.clone(), bus.clone());
    let deriver = NotificationDeriver::new(tasks, notifications.clone(), bus);

    let task = engine.create_task(brochure(), &sales()).await.unwrap();
    let up_to = notifications.last_sequence().await.unwrap();

    // backfilled after the watermark, with a log time before it
    assert_eq!(deriver.backfill_task(task.id).await.unwrap(), 1);

    assert!(notifications.mark_all_read(SALES_USER, up_to).await.unwrap().is_empty());
    assert_eq!(deriver.unread_count(SALES_USER).await.unwrap(), 1);

    assert_eq!(deriver.mark_all_as_read(SALES_USER).await.unwrap(), 1);
    assert_eq!(deriver.unread_count(SALES_USER).await.unwrap(), 0);
}
