//! Event type definitions for the notification pipeline.
//!
//! Events carry the payload that will be delivered to subscribers, plus the
//! instant the underlying state change committed. They are emitted only
//! after that commit, so a subscriber is never notified of state that could
//! still roll back.

use inkpress_sdk::objects::{EventType, WebhookEnvelope};
use time::OffsetDateTime;
use uuid::Uuid;

/// A committed entity lifecycle transition, ready for webhook fan-out.
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub event_type: EventType,
    pub entity_id: Uuid,
    pub occurred_at: OffsetDateTime,
    /// Subscriber-visible payload; becomes the envelope's `data` field.
    pub payload: serde_json::Value,
}

impl DomainEvent {
    /// Build the canonical delivery envelope for this event.
    pub fn envelope(&self) -> WebhookEnvelope {
        WebhookEnvelope::new(
            &self.event_type.to_string(),
            self.occurred_at,
            self.payload.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpress_sdk::objects::{EntityKind, EventKind};

    #[test]
    fn envelope_carries_event_name_and_payload() {
        let event = DomainEvent {
            event_type: EventType::new(EntityKind::Post, EventKind::Published),
            entity_id: Uuid::from_u128(7),
            occurred_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            payload: serde_json::json!({"slug": "hello-world"}),
        };
        let envelope = event.envelope();
        assert_eq!(envelope.event, "post.published");
        assert_eq!(envelope.data["slug"], "hello-world");
    }
}
