//! Domain events and the channels that carry them.
//!
//! A content mutation flows: commit → [`EventDetector::emit`] →
//! [`DomainEvent`] on the dispatch channel → webhook dispatcher. Events are
//! ephemeral; delivery is best-effort relative to the mutating request.

pub mod channels;
pub mod detector;
pub mod types;

pub use channels::{domain_event_channel, DomainEventReceiver, DomainEventSender};
pub use detector::EventDetector;
pub use types::DomainEvent;
