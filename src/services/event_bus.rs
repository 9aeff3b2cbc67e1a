//! EventBus service for task and notification event streaming.
//!
//! Provides a broadcast-based event system with sequence numbering. Delivery
//! is at-least-once from the consumer's point of view: a subscriber that
//! falls behind is told how many events it missed and must reconcile.

use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{EventsConfig, Notification, Task, TaskComment, TaskFile, TaskLog, UserId};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing sequence number assigned by EventBus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Placeholder until the bus assigns the real number.
    pub fn zero() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topic an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Log, comment and file appends
    Task,
    /// Notification created or read
    Notification,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Notification => write!(f, "notification"),
        }
    }
}

/// A log entry together with the task facts a consumer needs to react to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLogEvent {
    pub task_id: Uuid,
    pub task_title: String,
    pub created_by: UserId,
    /// Assignee in effect right after the entry was appended
    pub assigned_to: Option<UserId>,
    pub log: TaskLog,
}

impl TaskLogEvent {
    /// Snapshot `task` for `log`. The task is the state right after the
    /// append, so `assigned_to` already reflects a reassignment.
    pub fn new(task: &Task, log: TaskLog) -> Self {
        Self::with_assignee(task, log, task.assigned_to.clone())
    }

    fn with_assignee(task: &Task, log: TaskLog, assigned_to: Option<UserId>) -> Self {
        Self {
            task_id: task.id,
            task_title: task.title.clone(),
            created_by: task.created_by.clone(),
            assigned_to,
            log,
        }
    }

    /// Rebuild the event of every log entry of a stored task, each with the
    /// assignee it was published with.
    pub fn replay(task: &Task) -> Vec<Self> {
        task.logs_with_assignee()
            .map(|(log, assignee)| Self::with_assignee(task, log.clone(), assignee.map(str::to_string)))
            .collect()
    }
}

/// Unified event envelope containing all event metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedEvent {
    pub id: EventId,
    /// Publish order within this bus
    pub sequence: SequenceNumber,
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    pub task_id: Option<Uuid>,
    pub payload: EventPayload,
}

/// What happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    /// A creation, transition or reassignment was committed.
    LogAppended(TaskLogEvent),
    /// A comment was added; comments never produce notifications.
    CommentAdded {
        task_id: Uuid,
        comment: TaskComment,
    },
    /// A file reference was recorded on a task.
    FileAdded {
        task_id: Uuid,
        file: TaskFile,
    },
    /// The deriver stored a new notification.
    NotificationCreated(Notification),
    /// One or more notifications of `user_id` were marked read.
    NotificationsRead {
        user_id: UserId,
        notification_ids: Vec<Uuid>,
    },
}

impl EventPayload {
    /// Topic used for filtered subscriptions.
    pub fn category(&self) -> EventCategory {
        match self {
            Self::LogAppended(_) | Self::CommentAdded { .. } | Self::FileAdded { .. } => {
                EventCategory::Task
            }
            Self::NotificationCreated(_) | Self::NotificationsRead { .. } => {
                EventCategory::Notification
            }
        }
    }

    /// Task the event concerns, when there is exactly one.
    pub fn task_id(&self) -> Option<Uuid> {
        match self {
            Self::LogAppended(e) => Some(e.task_id),
            Self::CommentAdded { task_id, .. } | Self::FileAdded { task_id, .. } => Some(*task_id),
            Self::NotificationCreated(n) => Some(n.task_id),
            Self::NotificationsRead { .. } => None,
        }
    }
}

impl From<EventPayload> for UnifiedEvent {
    fn from(payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            sequence: SequenceNumber::zero(),
            timestamp: Utc::now(),
            category: payload.category(),
            task_id: payload.task_id(),
            payload,
        }
    }
}

/// Selects events for a filtered subscription.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only this topic, when set
    pub category: Option<EventCategory>,
    /// Only this task, when set
    pub task_id: Option<Uuid>,
}

impl EventFilter {
    /// Every event of one topic.
    pub fn category(category: EventCategory) -> Self {
        Self { category: Some(category), task_id: None }
    }

    /// Narrow to one task.
    pub fn with_task(mut self, task_id: Uuid) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Whether `event` passes every set criterion.
    pub fn matches(&self, event: &UnifiedEvent) -> bool {
        self.category.map_or(true, |c| c == event.category)
            && self.task_id.map_or(true, |id| event.task_id == Some(id))
    }
}

/// Item yielded by a filtered subscription.
#[derive(Debug, Clone)]
pub enum BusMessage {
    /// An event that passed the filter.
    Event(UnifiedEvent),
    /// The subscriber fell behind and this many events were dropped.
    Lagged(u64),
}

/// Tuning for [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Events buffered per subscriber before it lags
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { channel_capacity: 1024 }
    }
}

impl From<&EventsConfig> for EventBusConfig {
    fn from(config: &EventsConfig) -> Self {
        Self { channel_capacity: config.channel_capacity.max(1) }
    }
}

/// In-process broadcast bus. Every subscriber sees every event published
/// after it subscribed, in publish order.
pub struct EventBus {
    sender: broadcast::Sender<UnifiedEvent>,
    sequence: AtomicU64,
}

impl EventBus {
    /// Bus with a channel of at least one slot.
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Assign the next sequence number and broadcast. Returns the sequence.
    pub fn publish(&self, mut event: UnifiedEvent) -> SequenceNumber {
        let seq = SequenceNumber(self.sequence.fetch_add(1, Ordering::SeqCst));
        event.sequence = seq;

        tracing::trace!(sequence = seq.0, category = %event.category, task_id = ?event.task_id, "publishing event");

        // No subscribers is not an error.
        let _ = self.sender.send(event);
        seq
    }

    /// Wrap `payload` in a fresh envelope and publish it.
    pub fn publish_payload(&self, payload: EventPayload) -> SequenceNumber {
        self.publish(payload.into())
    }

    /// Raw receiver; lag shows up as `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<UnifiedEvent> {
        self.sender.subscribe()
    }

    /// Stream of events matching `filter`. Lag is surfaced as
    /// `BusMessage::Lagged`; the stream ends when the bus is dropped.
    pub fn subscribe_filtered(&self, filter: EventFilter) -> impl Stream<Item = BusMessage> + Send + 'static {
        let receiver = self.sender.subscribe();
        futures::stream::unfold(receiver, |mut rx| async move {
            match rx.recv().await {
                Ok(event) => Some((BusMessage::Event(event), rx)),
                Err(broadcast::error::RecvError::Lagged(n)) => Some((BusMessage::Lagged(n), rx)),
                Err(broadcast::error::RecvError::Closed) => None,
            }
        })
        .filter(move |message| {
            let keep = match message {
                BusMessage::Event(event) => filter.matches(event),
                BusMessage::Lagged(_) => true,
            };
            futures::future::ready(keep)
        })
    }

    /// Sequence number the next publish will get.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    /// Live receivers, filtered streams included.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NewTask;

    fn log_event() -> EventPayload {
        let task = Task::create(NewTask::new("Poster", "A2 gloss", "City Gym"), "s1").unwrap();
        let log = task.logs[0].clone();
        EventPayload::LogAppended(TaskLogEvent::new(&task, log))
    }

    #[tokio::test]
    async fn test_event_bus_sequence_assignment() {
        let bus = EventBus::default();
        assert_eq!(bus.current_sequence().0, 0);

        let mut rx = bus.subscribe();
        bus.publish_payload(log_event());
        bus.publish_payload(log_event());

        assert_eq!(rx.recv().await.unwrap().sequence.0, 0);
        assert_eq!(rx.recv().await.unwrap().sequence.0, 1);
        assert_eq!(bus.current_sequence().0, 2);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish_payload(log_event()).0, 0);
    }

    #[tokio::test]
    async fn test_filtered_subscription() {
        let bus = EventBus::default();
        let mut notifications = Box::pin(bus.subscribe_filtered(EventFilter::category(EventCategory::Notification)));

        bus.publish_payload(log_event());
        bus.publish_payload(EventPayload::NotificationsRead {
            user_id: "u1".into(),
            notification_ids: vec![],
        });

        match notifications.next().await {
            Some(BusMessage::Event(event)) => {
                assert_eq!(event.category, EventCategory::Notification);
                assert_eq!(event.sequence.0, 1);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_filtered_subscription_reports_lag() {
        let bus = EventBus::new(EventBusConfig { channel_capacity: 2 });
        let mut stream = Box::pin(bus.subscribe_filtered(EventFilter::default()));

        for _ in 0..5 {
            bus.publish_payload(log_event());
        }

        assert!(matches!(stream.next().await, Some(BusMessage::Lagged(3))));
    }

    #[test]
    fn test_payload_serializes_with_type_tag() {
        let json = serde_json::to_value(log_event()).unwrap();
        assert_eq!(json["type"], "LogAppended");
        assert_eq!(json["data"]["log"]["action"], "created");
    }
}
