//! Event detector: the single entry point for emitting domain events.

use super::channels::DomainEventSender;
use super::types::DomainEvent;
use inkpress_sdk::objects::EventType;
use time::OffsetDateTime;
use tracing::{debug, error};
use uuid::Uuid;

/// Fans entity lifecycle transitions out to the webhook dispatcher.
///
/// Pure pass-through: no retry or persistence here. Callers must emit only
/// after the underlying state change (including any revision write) has
/// committed.
#[derive(Clone)]
pub struct EventDetector {
    tx: DomainEventSender,
}

impl EventDetector {
    pub fn new(tx: DomainEventSender) -> Self {
        Self { tx }
    }

    /// Emit a committed lifecycle transition.
    ///
    /// A closed dispatch channel (shutdown in progress) is logged and
    /// swallowed: notification is a side effect, never a reason to fail the
    /// mutation that already committed.
    pub async fn emit(&self, event_type: EventType, entity_id: Uuid, payload: serde_json::Value) {
        let event = DomainEvent {
            event_type,
            entity_id,
            occurred_at: OffsetDateTime::now_utc(),
            payload,
        };
        debug!(event = %event.event_type, entity_id = %entity_id, "Emitting domain event");
        if self.tx.send(event).await.is_err() {
            error!(
                event = %event_type,
                entity_id = %entity_id,
                "Event channel closed; dropping domain event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpress_sdk::objects::{EntityKind, EventKind};

    #[tokio::test]
    async fn emit_forwards_to_the_channel() {
        let (tx, mut rx) = super::super::channels::domain_event_channel();
        let detector = EventDetector::new(tx);
        detector
            .emit(
                EventType::new(EntityKind::Page, EventKind::Created),
                Uuid::from_u128(1),
                serde_json::json!({"title": "t"}),
            )
            .await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type.to_string(), "page.created");
        assert_eq!(event.entity_id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn emit_survives_a_closed_channel() {
        let (tx, rx) = super::super::channels::domain_event_channel();
        drop(rx);
        let detector = EventDetector::new(tx);
        // Must not panic or error out.
        detector
            .emit(
                EventType::new(EntityKind::Media, EventKind::Deleted),
                Uuid::from_u128(2),
                serde_json::Value::Null,
            )
            .await;
    }
}
