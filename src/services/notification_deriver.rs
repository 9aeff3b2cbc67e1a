//! Notification deriver.
//!
//! Consumes `LogAppended` events and writes one notification per log entry
//! for the party that did not act. Redelivered events are absorbed by the
//! repository's dedupe on the source log id. Backfill replays a task's log
//! to recover the assignee each entry was published with, so a log entry
//! reaches the same recipient whichever way it arrives.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ErrorKind};
use crate::domain::models::Notification;
use crate::domain::ports::{NotificationRepository, TaskFilter, TaskRepository};
use crate::services::event_bus::{EventBus, EventPayload, TaskLogEvent, UnifiedEvent};
use crate::services::retry::RetryPolicy;

/// Who hears about a log entry: the creator when the assignee acted,
/// otherwise the assignee, falling back to the creator.
pub fn recipient_for(event: &TaskLogEvent) -> &str {
    match event.assigned_to.as_deref() {
        Some(assignee) if assignee == event.log.performed_by => event.created_by.as_str(),
        Some(assignee) => assignee,
        None => event.created_by.as_str(),
    }
}

/// Default for [`NotificationDeriver::with_reconcile_margin`].
pub const DEFAULT_RECONCILE_MARGIN_SECS: i64 = 300;

/// Turns task log entries into per-user notifications and tracks reads.
pub struct NotificationDeriver<T: TaskRepository, N: NotificationRepository> {
    tasks: Arc<T>,
    notifications: Arc<N>,
    bus: Arc<EventBus>,
    retry: RetryPolicy,
    reconcile_margin: Duration,
}

impl<T, N> NotificationDeriver<T, N>
where
    T: TaskRepository + 'static,
    N: NotificationRepository + 'static,
{
    /// Deriver with the default retry policy and reconcile margin.
    pub fn new(tasks: Arc<T>, notifications: Arc<N>, bus: Arc<EventBus>) -> Self {
        Self {
            tasks,
            notifications,
            bus,
            retry: RetryPolicy::default(),
            reconcile_margin: Duration::seconds(DEFAULT_RECONCILE_MARGIN_SECS),
        }
    }

    /// Backoff used when storing a notification fails.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// After lagging, re-derive tasks updated up to `margin` before the
    /// newest log entry already handled. Log entries are stamped before
    /// their commit, so events can arrive out of timestamp order.
    pub fn with_reconcile_margin(mut self, margin: Duration) -> Self {
        self.reconcile_margin = margin;
        self
    }

    /// Derive the notification for one log event. Returns `None` when the
    /// event was already handled.
    #[instrument(skip(self, event), fields(task_id = %event.task_id, log_id = %event.log.id))]
    pub async fn handle_event(&self, event: &TaskLogEvent) -> DomainResult<Option<Notification>> {
        let recipient = recipient_for(event);
        let notification = Notification::from_log(event.task_id, &event.task_title, &event.log, recipient);

        if self.notifications.insert_if_absent(&notification).await? {
            debug!(recipient, notification_id = %notification.id, "notification created");
            self.bus
                .publish_payload(EventPayload::NotificationCreated(notification.clone()));
            Ok(Some(notification))
        } else {
            debug!("log entry already notified");
            Ok(None)
        }
    }

    /// Re-derive every log entry of one task. Returns how many
    /// notifications were missing and got created.
    pub async fn backfill_task(&self, task_id: Uuid) -> DomainResult<usize> {
        let task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;

        let mut created = 0;
        for event in TaskLogEvent::replay(&task) {
            if self.handle_event(&event).await?.is_some() {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Backfill every task updated at or after `since` (all tasks when
    /// `None`).
    pub async fn reconcile_since(&self, since: Option<DateTime<Utc>>) -> DomainResult<usize> {
        let tasks = self
            .tasks
            .list(TaskFilter {
                updated_since: since,
                ..Default::default()
            })
            .await?;

        let mut created = 0;
        for task in &tasks {
            created += self.backfill_task(task.id).await?;
        }
        info!(tasks = tasks.len(), created, "reconciled notifications");
        Ok(created)
    }

    /// Run the consumer loop on its own task.
    ///
    /// Events are handled one at a time in arrival order. Dropping the
    /// returned handle stops the loop just like `shutdown`.
    pub fn spawn(self: Arc<Self>, mut receiver: broadcast::Receiver<UnifiedEvent>) -> DeriverHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut cursor = ConsumerCursor::default();
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        self.drain(&mut receiver, &mut cursor).await;
                        break;
                    }
                    received = receiver.recv() => match received {
                        Ok(event) => self.process(&event, &mut cursor).await,
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "notification deriver lagged, reconciling from repository");
                            cursor.lagged = true;
                            self.settle(&mut cursor).await;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("event bus closed, stopping notification deriver");
                            break;
                        }
                    }
                }
            }
            if cursor.lagged || !cursor.pending.is_empty() {
                warn!(
                    pending_tasks = cursor.pending.len(),
                    lagged = cursor.lagged,
                    "notification deriver stopped with work outstanding; run `printflow notify sync`"
                );
            }
            debug!(processed = cursor.processed, "notification deriver stopped");
        });

        DeriverHandle { shutdown: shutdown_tx, join }
    }

    async fn process(&self, event: &UnifiedEvent, cursor: &mut ConsumerCursor) {
        let EventPayload::LogAppended(log_event) = &event.payload else {
            return;
        };
        match self.retry.retry_on_storage(|| self.handle_event(log_event)).await {
            Ok(_) => cursor.record(log_event.log.performed_at),
            Err(e) => {
                error!(task_id = %log_event.task_id, error = %e, "failed to derive notification, task queued for backfill");
                cursor.pending.insert(log_event.task_id);
            }
        }
        self.settle(cursor).await;
    }

    /// Retry outstanding work: a reconciliation owed after lag and tasks
    /// whose live event could not be stored.
    async fn settle(&self, cursor: &mut ConsumerCursor) {
        if cursor.lagged {
            let since = cursor.reconcile_from(self.reconcile_margin);
            match self.reconcile_since(since).await {
                Ok(_) => cursor.lagged = false,
                Err(e) => error!(error = %e, "notification reconciliation failed, will retry"),
            }
        }

        let pending: Vec<Uuid> = cursor.pending.iter().copied().collect();
        for task_id in pending {
            match self.backfill_task(task_id).await {
                Ok(created) => {
                    debug!(%task_id, created, "backfilled task after failure");
                    cursor.pending.remove(&task_id);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    cursor.pending.remove(&task_id);
                }
                Err(e) => warn!(%task_id, error = %e, "backfill still failing"),
            }
        }
    }

    /// Handle whatever is already queued, then return.
    async fn drain(&self, receiver: &mut broadcast::Receiver<UnifiedEvent>, cursor: &mut ConsumerCursor) {
        loop {
            match receiver.try_recv() {
                Ok(event) => self.process(&event, cursor).await,
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "lagged while draining, reconciling from repository");
                    cursor.lagged = true;
                    self.settle(cursor).await;
                }
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => break,
            }
        }
    }

    /// Notifications for `user_id`, newest first.
    pub async fn list(&self, user_id: &str, unread_only: bool) -> DomainResult<Vec<Notification>> {
        self.notifications.list_for_user(user_id, unread_only).await
    }

    /// Unread notifications of `user_id`.
    pub async fn unread_count(&self, user_id: &str) -> DomainResult<u64> {
        self.notifications.unread_count(user_id).await
    }

    /// Mark one notification read. Only its recipient may do so; anyone else
    /// is told it does not exist. Marking twice is a no-op.
    #[instrument(skip(self))]
    pub async fn mark_as_read(&self, notification_id: Uuid, recipient: &str) -> DomainResult<Notification> {
        let mut notification = self
            .notifications
            .get(notification_id)
            .await?
            .filter(|n| n.user_id == recipient)
            .ok_or(DomainError::NotificationNotFound(notification_id))?;

        if !notification.read {
            self.notifications.mark_read(notification_id).await?;
            notification.read = true;
            self.bus.publish_payload(EventPayload::NotificationsRead {
                user_id: recipient.to_string(),
                notification_ids: vec![notification_id],
            });
        }
        Ok(notification)
    }

    /// Mark everything stored for `user_id` when the call starts as read.
    /// Notifications inserted after that stay unread, however old the log
    /// entry they came from.
    #[instrument(skip(self))]
    pub async fn mark_all_as_read(&self, user_id: &str) -> DomainResult<u64> {
        let up_to = self.notifications.last_sequence().await?;
        let flipped = self.notifications.mark_all_read(user_id, up_to).await?;
        let count = flipped.len() as u64;

        if !flipped.is_empty() {
            self.bus.publish_payload(EventPayload::NotificationsRead {
                user_id: user_id.to_string(),
                notification_ids: flipped,
            });
        }
        info!(user_id, flipped = count, "marked notifications read");
        Ok(count)
    }
}

#[derive(Debug, Default)]
struct ConsumerCursor {
    /// Newest `performed_at` among handled log entries
    newest_log_at: Option<DateTime<Utc>>,
    /// Events were dropped and the repository has not been reconciled yet
    lagged: bool,
    /// Tasks whose live event failed to store
    pending: BTreeSet<Uuid>,
    processed: u64,
}

impl ConsumerCursor {
    fn record(&mut self, performed_at: DateTime<Utc>) {
        self.newest_log_at = Some(self.newest_log_at.map_or(performed_at, |t| t.max(performed_at)));
        self.processed += 1;
    }

    /// Lower bound for lag recovery; everything when nothing was handled.
    fn reconcile_from(&self, margin: Duration) -> Option<DateTime<Utc>> {
        self.newest_log_at.and_then(|t| t.checked_sub_signed(margin))
    }
}

/// Handle to a running deriver loop.
pub struct DeriverHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DeriverHandle {
    /// Process every event already published, then stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            warn!(error = %e, "notification deriver task ended abnormally");
        }
    }

    /// Whether the loop has already exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
