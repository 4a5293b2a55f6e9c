//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`TriggerEvent`]s. It is
//! shared via `Arc<EventBus>` between producers (HTTP adapter, schedule
//! ticker) and the automation listener.

use chrono::{DateTime, Utc};
use mailivo_core::trigger::{EventPayload, TriggerType};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TriggerEvent
// ---------------------------------------------------------------------------

/// One firing of a trigger.
///
/// Constructed via [`TriggerEvent::new`] and enriched with
/// [`with_payload`](TriggerEvent::with_payload),
/// [`with_source`](TriggerEvent::with_source) and
/// [`at`](TriggerEvent::at).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    /// Unique, time-ordered event id.
    pub event_id: Uuid,

    pub trigger_type: TriggerType,

    pub payload: EventPayload,

    /// When the event occurred (UTC). Schedules are evaluated against it.
    pub occurred_at: DateTime<Utc>,

    /// Producer name, e.g. `"api"` or `"scheduler"`.
    pub source: Option<String>,
}

impl TriggerEvent {
    pub fn new(trigger_type: TriggerType) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            trigger_type,
            payload: EventPayload::default(),
            occurred_at: Utc::now(),
            source: None,
        }
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Override the occurrence time.
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`TriggerEvent`].
pub struct EventBus {
    sender: broadcast::Sender<TriggerEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Returns the number of
    /// subscribers that will see it; with none the event is dropped.
    pub fn publish(&self, event: TriggerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let payload = EventPayload {
            property_id: Some("prop-1".into()),
            ..Default::default()
        };
        let delivered = bus.publish(
            TriggerEvent::new(TriggerType::PropertyUploaded)
                .with_payload(payload)
                .with_source("api"),
        );
        assert_eq!(delivered, 1);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.trigger_type, TriggerType::PropertyUploaded);
        assert_eq!(received.payload.property_id.as_deref(), Some("prop-1"));
        assert_eq!(received.source.as_deref(), Some("api"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = TriggerEvent::new(TriggerType::Unsubscribe);
        bus.publish(event.clone());

        assert_eq!(rx1.recv().await.unwrap().event_id, event.event_id);
        assert_eq!(rx2.recv().await.unwrap().event_id, event.event_id);
    }

    #[test]
    fn publish_with_no_subscribers_is_dropped() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(TriggerEvent::new(TriggerType::TimeBased)), 0);
    }

    #[test]
    fn event_serializes_camel_case() {
        let event = TriggerEvent::new(TriggerType::PropertyViewed);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["triggerType"], "property_viewed");
        assert!(value.get("occurredAt").is_some());
    }
}
