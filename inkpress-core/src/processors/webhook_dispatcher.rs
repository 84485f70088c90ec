//! WebhookDispatcher processor.
//!
//! The WebhookDispatcher is responsible for:
//! - Receiving `DomainEvent`s from the event channel
//! - Looking up matching active subscriptions in the registry
//! - Sending HTTP POSTs with the signed envelope body
//! - Handling retries with exponential backoff within a bounded attempt
//!   budget, then abandoning the delivery
//!
//! Delivery is fire-and-forget relative to the request that triggered the
//! event: a slow or unreachable subscriber can never block a mutation.
//! Concurrency is bounded by a semaphore so event bursts cannot spawn
//! unbounded delivery tasks. On shutdown, in-flight attempts run to their
//! configured timeout; backoff sleeps that have not fired are dropped.
//!
//! Signature generation is delegated to `inkpress-sdk`, which keeps the
//! cryptographic scheme next to the receiver-side verification code.

use crate::entities::webhook_subscription::{ActiveSubscriptionsForEvent, WebhookSubscription};
use crate::events::{DomainEvent, DomainEventReceiver};
use crate::framework::DatabaseProcessor;
use inkpress_sdk::objects::subscriptions::clamp_timeout;
use inkpress_sdk::objects::{TestDeliveryResponse, WebhookEnvelope};
use inkpress_sdk::objects::events::TEST_EVENT;
use inkpress_sdk::signature::{sign_body, SIGNATURE_HEADER};
use kanau::processor::Processor;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

/// Delivery attempts per matched subscription (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Backoff before the second attempt; doubles each failure after that.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Concurrent delivery tasks across all events.
pub const DEFAULT_WORKERS: usize = 8;

/// Tunables for the dispatcher, fixed at startup.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Errors for a single delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Transport-level failure: connection refused, DNS, timeout.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("endpoint answered {status}")]
    EndpointFailure { status: u16 },
}

/// Terminal result of one (event, subscription) delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16, attempts: u32 },
    Abandoned { attempts: u32 },
}

/// One queued delivery: an event envelope bound to one subscription.
#[derive(Debug, Clone)]
struct DeliveryJob {
    subscription: WebhookSubscription,
    event: String,
    body: String,
}

/// WebhookDispatcher matches events to subscriptions and delivers them.
pub struct WebhookDispatcher {
    db: DatabaseProcessor,
    event_rx: DomainEventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    http_client: reqwest::Client,
    config: DispatcherConfig,
}

impl WebhookDispatcher {
    /// Create a new WebhookDispatcher.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool (subscription registry reads)
    /// * `event_rx` - Receiver for DomainEvent events
    /// * `shutdown_rx` - Receiver for shutdown signal
    /// * `config` - Retry and concurrency tunables
    pub fn new(
        pool: PgPool,
        event_rx: DomainEventReceiver,
        shutdown_rx: watch::Receiver<bool>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            db: DatabaseProcessor::new(pool),
            event_rx,
            shutdown_rx,
            http_client: reqwest::Client::new(),
            config,
        }
    }

    /// Run the WebhookDispatcher until shutdown or channel close.
    pub async fn run(mut self) {
        info!(workers = self.config.workers, "WebhookDispatcher started");
        let permits = Arc::new(Semaphore::new(self.config.workers));

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    // A dropped sender would otherwise complete this arm
                    // immediately on every iteration.
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("WebhookDispatcher received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.event_rx.recv() => {
                    debug!(event = %event.event_type, "Received domain event");
                    if let Err(e) = self.dispatch(event, &permits).await {
                        error!(error = %e, "Failed to dispatch domain event");
                    }
                }

                else => {
                    info!("Domain event channel closed");
                    break;
                }
            }
        }

        // Let in-flight deliveries finish up to their timeouts.
        let _all = permits.acquire_many(self.config.workers as u32).await;
        info!("WebhookDispatcher shutdown complete");
    }

    /// Match an event against the registry and queue one delivery per
    /// matching subscription.
    async fn dispatch(
        &self,
        event: DomainEvent,
        permits: &Arc<Semaphore>,
    ) -> Result<(), sqlx::Error> {
        let event_name = event.event_type.to_string();
        let subscriptions = self
            .db
            .process(ActiveSubscriptionsForEvent {
                event_type: event_name.clone(),
            })
            .await?;

        if subscriptions.is_empty() {
            debug!(event = %event_name, "No matching subscriptions");
            return Ok(());
        }

        let body = match serde_json::to_string(&event.envelope()) {
            Ok(b) => b,
            Err(e) => {
                // Envelope fields are all serializable; this is a programmer
                // error, not a runtime condition to recover from.
                error!(event = %event_name, error = %e, "Failed to serialize envelope");
                return Ok(());
            }
        };

        for subscription in subscriptions {
            let job = DeliveryJob {
                subscription,
                event: event_name.clone(),
                body: body.clone(),
            };
            let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
                // Semaphore closed only at teardown.
                return Ok(());
            };
            let http_client = self.http_client.clone();
            let config = self.config.clone();
            let shutdown_rx = self.shutdown_rx.clone();
            tokio::spawn(async move {
                let _permit = permit;
                deliver_with_retry(
                    &http_client,
                    &job.subscription,
                    &job.event,
                    &job.body,
                    &config,
                    shutdown_rx,
                )
                .await;
            });
        }

        Ok(())
    }
}

/// Drive one delivery through its attempt budget.
///
/// State machine per attempt: pending -> sending -> delivered | failed;
/// a failure with remaining budget re-enters pending after the backoff,
/// a failure with none is terminal.
pub async fn deliver_with_retry(
    http_client: &reqwest::Client,
    subscription: &WebhookSubscription,
    event: &str,
    body: &str,
    config: &DispatcherConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> DeliveryOutcome {
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match attempt_delivery(http_client, subscription, body).await {
            Ok(status) => {
                info!(
                    event,
                    subscription = %subscription.id,
                    status,
                    attempt,
                    "Webhook delivered"
                );
                return DeliveryOutcome::Delivered { status, attempts: attempt };
            }
            Err(e) => {
                warn!(
                    event,
                    subscription = %subscription.id,
                    error = %e,
                    attempt,
                    "Webhook delivery attempt failed"
                );
            }
        }

        if attempt == max_attempts {
            break;
        }

        let backoff = calculate_backoff(attempt, config.base_backoff);
        let sleep = tokio::time::sleep(backoff);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // A notification that isn't a real shutdown must not eat
                    // the backoff; a dropped sender means the process is
                    // tearing down, so treat it the same as a shutdown.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        // Scheduled retries may be dropped during shutdown.
                        info!(
                            event,
                            subscription = %subscription.id,
                            "Shutdown during backoff; dropping scheduled retry"
                        );
                        return DeliveryOutcome::Abandoned { attempts: attempt };
                    }
                }

                _ = &mut sleep => break,
            }
        }
    }

    error!(
        event,
        subscription = %subscription.id,
        attempts = max_attempts,
        "Webhook delivery abandoned after exhausting retry budget"
    );
    DeliveryOutcome::Abandoned { attempts: max_attempts }
}

/// One HTTP POST: signed body, subscription timeout, 2xx counts as success.
///
/// The body is re-signed on every attempt so retried deliveries carry a
/// fresh signature timestamp.
async fn attempt_delivery(
    http_client: &reqwest::Client,
    subscription: &WebhookSubscription,
    body: &str,
) -> Result<u16, DeliveryError> {
    let signature = sign_body(body, subscription.secret.as_bytes());
    let timeout = Duration::from_secs(clamp_timeout(subscription.timeout_secs) as u64);

    let response = http_client
        .post(&subscription.target_url)
        .header("Content-Type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .timeout(timeout)
        .body(body.to_owned())
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        Ok(status.as_u16())
    } else {
        Err(DeliveryError::EndpointFailure {
            status: status.as_u16(),
        })
    }
}

/// Perform exactly one delivery attempt with a synthetic test payload.
///
/// No retries and no suppression: the raw outcome (status code or transport
/// error) goes straight back to the operator diagnosing the endpoint.
pub async fn test_delivery(
    http_client: &reqwest::Client,
    subscription: &WebhookSubscription,
) -> TestDeliveryResponse {
    let envelope = WebhookEnvelope::new(
        TEST_EVENT,
        time::OffsetDateTime::now_utc(),
        serde_json::json!({
            "subscription_id": subscription.id,
            "subscription_name": subscription.name,
        }),
    );
    let body = match serde_json::to_string(&envelope) {
        Ok(b) => b,
        Err(e) => {
            return TestDeliveryResponse {
                delivered: false,
                status: None,
                error: Some(format!("failed to serialize test payload: {e}")),
            };
        }
    };

    match attempt_delivery(http_client, subscription, &body).await {
        Ok(status) => TestDeliveryResponse {
            delivered: true,
            status: Some(status),
            error: None,
        },
        Err(DeliveryError::EndpointFailure { status }) => TestDeliveryResponse {
            delivered: false,
            status: Some(status),
            error: None,
        },
        Err(DeliveryError::Request(e)) => TestDeliveryResponse {
            delivered: false,
            status: None,
            error: Some(e.to_string()),
        },
    }
}

/// Backoff before the retry following `attempt` failures.
///
/// Exponential: base * 2^(attempt-1), capped at 2^10 * base.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    base.saturating_mul(2u32.pow(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_failed_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(calculate_backoff(1, base), Duration::from_secs(1));
        assert_eq!(calculate_backoff(2, base), Duration::from_secs(2));
        assert_eq!(calculate_backoff(3, base), Duration::from_secs(4));
        assert_eq!(calculate_backoff(4, base), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped() {
        let base = Duration::from_secs(1);
        assert_eq!(calculate_backoff(11, base), Duration::from_secs(1024));
        assert_eq!(calculate_backoff(100, base), Duration::from_secs(1024));
    }

    #[test]
    fn backoff_scales_with_base() {
        let base = Duration::from_millis(10);
        assert_eq!(calculate_backoff(3, base), Duration::from_millis(40));
    }
}
