//! Management API and webhook wire objects.

pub mod events;
pub mod revisions;
pub mod subscriptions;

pub use events::{EntityKind, EventKind, EventType, WebhookEnvelope, matches_event, WILDCARD_PATTERN};
pub use revisions::{ManualSaveRequest, RestoreRevisionResponse, RevisionResponse};
pub use subscriptions::{
    CreateSubscriptionRequest, CreateSubscriptionResponse, SubscriptionResponse,
    TestDeliveryResponse, UpdateSubscriptionRequest,
};

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Upper bound for page size on list endpoints.
pub const MAX_PER_PAGE: u32 = 100;

/// Query parameters for paginated list endpoints (1-based page index).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageQuery {
    /// Clamp to sane bounds: page >= 1, 1 <= per_page <= [`MAX_PER_PAGE`].
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// SQL offset for this page.
    pub fn offset(&self) -> i64 {
        let clamped = self.clamped();
        i64::from(clamped.page - 1) * i64::from(clamped.per_page)
    }

    /// SQL limit for this page.
    pub fn limit(&self) -> i64 {
        i64::from(self.clamped().per_page)
    }
}

/// A page of results from a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_bounds() {
        let q = PageQuery { page: 0, per_page: 10_000 }.clamped();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn page_query_offset_and_limit() {
        let q = PageQuery { page: 3, per_page: 25 };
        assert_eq!(q.offset(), 50);
        assert_eq!(q.limit(), 25);
    }
}
