//! Webhook subscription objects for the management API.
//!
//! The subscription secret is write-only: it can be set on create/update but
//! is never included in a response object.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Lower bound for per-delivery timeout.
pub const MIN_TIMEOUT_SECS: i32 = 5;
/// Upper bound for per-delivery timeout.
pub const MAX_TIMEOUT_SECS: i32 = 60;
/// Default per-delivery timeout when none is given.
pub const DEFAULT_TIMEOUT_SECS: i32 = 30;

/// A registered webhook subscription (secret omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub name: String,
    pub target_url: String,
    /// Event patterns: exact event names or the `*` wildcard.
    pub events: Vec<String>,
    pub active: bool,
    pub timeout_secs: i32,
    /// Unix timestamp (seconds).
    pub created_at: i64,
    /// Unix timestamp (seconds).
    pub updated_at: i64,
}

/// Request body for registering a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub name: String,
    pub target_url: Url,
    pub events: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: i32,
    /// Omit to have the server generate a random secret.
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_active() -> bool {
    true
}

fn default_timeout() -> i32 {
    DEFAULT_TIMEOUT_SECS
}

/// Response to a successful registration.
///
/// The only response that ever carries the signing secret, so a
/// server-generated secret can be recorded by the caller exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionResponse {
    #[serde(flatten)]
    pub subscription: SubscriptionResponse,
    pub secret: String,
}

/// Request body for updating a subscription; absent fields are unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubscriptionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_url: Option<Url>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub timeout_secs: Option<i32>,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Raw outcome of a single-attempt test delivery.
///
/// Returned verbatim so an operator can diagnose endpoint configuration:
/// either the HTTP status the endpoint answered with, or the transport
/// error that prevented an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDeliveryResponse {
    pub delivered: bool,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Clamp a requested timeout into the allowed 5–60 second range.
pub fn clamp_timeout(timeout_secs: i32) -> i32 {
    timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_to_bounds() {
        assert_eq!(clamp_timeout(1), MIN_TIMEOUT_SECS);
        assert_eq!(clamp_timeout(30), 30);
        assert_eq!(clamp_timeout(600), MAX_TIMEOUT_SECS);
    }

    #[test]
    fn create_request_defaults() {
        let req: CreateSubscriptionRequest = serde_json::from_str(
            r#"{"name":"ci","target_url":"https://example.com/hook","events":["*"]}"#,
        )
        .unwrap();
        assert!(req.active);
        assert_eq!(req.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(req.secret.is_none());
    }
}
