//! Event channel factory and handles.

use super::types::DomainEvent;
use tokio::sync::mpsc;

/// Default buffer size for the event channel.
///
/// Enough to absorb mutation bursts while keeping memory bounded; senders
/// back-pressure instead of growing without limit.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for domain events.
pub type DomainEventSender = mpsc::Sender<DomainEvent>;
/// Receiver handle for domain events.
pub type DomainEventReceiver = mpsc::Receiver<DomainEvent>;

/// Create the domain event channel.
///
/// One receiver (the webhook dispatcher) and as many cloned senders as
/// there are emitting call sites.
pub fn domain_event_channel() -> (DomainEventSender, DomainEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
