//! EventBus service for domain event distribution.
//!
//! Provides a broadcast-based event system with sequence numbering. Events
//! are named `<prefix>.<kind>.<action>` and carry the record they concern
//! (or none) along with the inbound payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::RecordRef;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
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
    pub fn zero() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inbound event family an outbound event derives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Pr,
    Create,
    PullRequestReview,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pr => "pr",
            Self::Create => "create",
            Self::PullRequestReview => "pull_request_review",
        }
    }

    /// Action used when the inbound payload carries none.
    pub const fn default_action(&self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Pr | Self::PullRequestReview => "unknown",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build an event name: `<prefix>.<kind>.<action>`.
pub fn event_name(prefix: &str, kind: EventKind, action: &str) -> String {
    format!("{prefix}.{kind}.{action}")
}

/// Outbound domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: EventId,
    pub sequence: SequenceNumber,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub kind: EventKind,
    pub action: String,
    /// The record this event concerns; `None` when nothing was resolved.
    pub record: Option<RecordRef>,
    /// The inbound payload, forwarded untouched.
    pub payload: Value,
}

impl DomainEvent {
    pub fn new(
        prefix: &str,
        kind: EventKind,
        action: impl Into<String>,
        record: Option<RecordRef>,
        payload: Value,
    ) -> Self {
        let action = action.into();
        Self {
            id: EventId::new(),
            sequence: SequenceNumber::zero(),
            timestamp: Utc::now(),
            name: event_name(prefix, kind, &action),
            kind,
            action,
            record,
            payload,
        }
    }
}

/// Configuration for the EventBus.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for the broadcast channel.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Central event bus for broadcasting events to multiple consumers.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
    sequence: AtomicU64,
}

impl EventBus {
    /// Create a new EventBus with the given configuration.
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish an event, returning the sequence number it was assigned.
    pub fn publish(&self, mut event: DomainEvent) -> SequenceNumber {
        let seq = SequenceNumber(self.sequence.fetch_add(1, Ordering::SeqCst));
        event.sequence = seq;

        tracing::debug!(event = %event.name, sequence = %seq, "Publishing event");

        // No subscribers is not an error
        let _ = self.sender.send(event);
        seq
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    /// Get the number of active subscribers.
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
    use serde_json::json;

    #[tokio::test]
    async fn test_event_bus_sequence_assignment() {
        let bus = EventBus::new(EventBusConfig::default());

        assert_eq!(bus.current_sequence().0, 0);

        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::new("p", EventKind::Pr, "opened", None, json!({})));
        let event1 = rx.recv().await.unwrap();
        assert_eq!(event1.sequence.0, 0);

        bus.publish(DomainEvent::new("p", EventKind::Pr, "closed", None, json!({})));
        let event2 = rx.recv().await.unwrap();
        assert_eq!(event2.sequence.0, 1);

        assert_eq!(bus.current_sequence().0, 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        let seq = bus.publish(DomainEvent::new("p", EventKind::Create, "created", None, Value::Null));
        assert_eq!(seq, SequenceNumber(0));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(
            event_name("aha-develop.github", EventKind::Pr, "opened"),
            "aha-develop.github.pr.opened"
        );
        assert_eq!(
            event_name("x", EventKind::PullRequestReview, "submitted"),
            "x.pull_request_review.submitted"
        );
        assert_eq!(EventKind::Create.default_action(), "created");
        assert_eq!(EventKind::Pr.default_action(), "unknown");
    }
}
