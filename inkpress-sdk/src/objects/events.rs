//! Domain event taxonomy and the webhook delivery envelope.
//!
//! The event taxonomy is flat and closed: an event is an entity kind plus a
//! lifecycle transition, rendered on the wire as `"{entity}.{transition}"`
//! (`page.published`, `media.created`, ...). Subscriptions match events by
//! exact set membership, with [`WILDCARD_PATTERN`] meaning "all events".
//! Patterns are stored as plain strings so namespaced matching (`page.*`)
//! could be added later without a data migration.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

/// The subscription pattern that matches every event.
pub const WILDCARD_PATTERN: &str = "*";

/// Event name used for operator-triggered test deliveries.
///
/// Deliberately outside the [`EventType`] taxonomy so a test delivery can
/// never be mistaken for a real domain event by a receiver.
pub const TEST_EVENT: &str = "webhook.test";

/// Revisionable/notifiable content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    Post,
    Category,
    Media,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Page,
        EntityKind::Post,
        EntityKind::Category,
        EntityKind::Media,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::Post => "post",
            EntityKind::Category => "category",
            EntityKind::Media => "media",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(EntityKind::Page),
            "post" => Ok(EntityKind::Post),
            "category" => Ok(EntityKind::Category),
            "media" => Ok(EntityKind::Media),
            _ => Err(UnknownEventType(s.to_owned())),
        }
    }
}

/// Lifecycle transitions that produce domain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Published,
    Unpublished,
    Deleted,
    Restored,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Created,
        EventKind::Updated,
        EventKind::Published,
        EventKind::Unpublished,
        EventKind::Deleted,
        EventKind::Restored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Published => "published",
            EventKind::Unpublished => "unpublished",
            EventKind::Deleted => "deleted",
            EventKind::Restored => "restored",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(EventKind::Created),
            "updated" => Ok(EventKind::Updated),
            "published" => Ok(EventKind::Published),
            "unpublished" => Ok(EventKind::Unpublished),
            "deleted" => Ok(EventKind::Deleted),
            "restored" => Ok(EventKind::Restored),
            _ => Err(UnknownEventType(s.to_owned())),
        }
    }
}

/// A fully-qualified domain event type, e.g. `page.published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType {
    pub entity: EntityKind,
    pub kind: EventKind,
}

impl EventType {
    pub fn new(entity: EntityKind, kind: EventKind) -> Self {
        Self { entity, kind }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.entity.as_str(), self.kind.as_str())
    }
}

/// Error for event-type strings outside the closed taxonomy.
#[derive(Debug, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl std::str::FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (entity, kind) = s.split_once('.').ok_or_else(|| UnknownEventType(s.to_owned()))?;
        Ok(Self {
            entity: entity.parse().map_err(|_| UnknownEventType(s.to_owned()))?,
            kind: kind.parse().map_err(|_| UnknownEventType(s.to_owned()))?,
        })
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Check whether a subscription's pattern set matches an event type.
///
/// Exact membership or the wildcard sentinel; no prefix semantics.
pub fn matches_event(patterns: &[String], event_type: &str) -> bool {
    patterns
        .iter()
        .any(|p| p == WILDCARD_PATTERN || p == event_type)
}

/// The JSON body of every webhook delivery.
///
/// ```json
/// {"event": "page.published", "occurred_at": "2026-08-27T12:00:00Z", "data": {...}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    /// RFC 3339 / ISO-8601 timestamp of the underlying state change.
    pub occurred_at: String,
    pub data: serde_json::Value,
}

impl WebhookEnvelope {
    /// Build an envelope for an event that occurred at the given instant.
    pub fn new(event: &str, occurred_at: time::OffsetDateTime, data: serde_json::Value) -> Self {
        let occurred_at = occurred_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| occurred_at.unix_timestamp().to_string());
        Self {
            event: event.to_owned(),
            occurred_at,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn event_type_display_round_trips() {
        for entity in EntityKind::ALL {
            for kind in EventKind::ALL {
                let event = EventType::new(entity, kind);
                let parsed: EventType = event.to_string().parse().unwrap();
                assert_eq!(parsed, event);
            }
        }
    }

    #[test]
    fn event_type_rejects_unknown_strings() {
        assert!("page".parse::<EventType>().is_err());
        assert!("page.exploded".parse::<EventType>().is_err());
        assert!("widget.created".parse::<EventType>().is_err());
        assert!("".parse::<EventType>().is_err());
    }

    #[test]
    fn exact_pattern_matches_only_its_event() {
        let patterns = vec!["post.published".to_owned()];
        assert!(matches_event(&patterns, "post.published"));
        assert!(!matches_event(&patterns, "media.created"));
    }

    #[test]
    fn wildcard_matches_everything() {
        let patterns = vec![WILDCARD_PATTERN.to_owned()];
        assert!(matches_event(&patterns, "post.published"));
        assert!(matches_event(&patterns, "media.created"));
        assert!(matches_event(&patterns, TEST_EVENT));
    }

    #[test]
    fn envelope_serializes_rfc3339_timestamp() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let envelope = WebhookEnvelope::new("page.published", at, serde_json::json!({"id": 1}));
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""event":"page.published""#));
        assert!(json.contains(r#""occurred_at":"2023-11-14T22:13:20Z""#));
    }

    #[test]
    fn event_type_serde_uses_dotted_string() {
        let event = EventType::new(EntityKind::Media, EventKind::Deleted);
        assert_eq!(serde_json::to_string(&event).unwrap(), r#""media.deleted""#);
        let back: EventType = serde_json::from_str(r#""media.deleted""#).unwrap();
        assert_eq!(back, event);
    }
}
