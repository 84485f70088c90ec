//! Background processors.
//!
//! - `WebhookDispatcher`: receives `DomainEvent`s, matches them against the
//!   subscription registry, and delivers signed webhooks with bounded
//!   retries.

pub mod webhook_dispatcher;

pub use webhook_dispatcher::{
    deliver_with_retry, test_delivery, DeliveryError, DeliveryOutcome, DispatcherConfig,
    WebhookDispatcher,
};
