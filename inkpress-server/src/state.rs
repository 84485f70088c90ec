//! Application state shared across all request handlers.

use inkpress_core::config::SharedConfig;
use inkpress_core::events::{DomainEventSender, EventDetector};
use inkpress_core::revisions::RevisionService;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
    /// Emits domain events toward the webhook dispatcher.
    pub events: EventDetector,
    /// Capture and restore orchestration.
    pub revisions: Arc<RevisionService>,
    /// HTTP client for operator-triggered test deliveries.
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Create a new AppState with the given database pool and configuration.
    pub fn new(db: PgPool, config: SharedConfig, event_tx: DomainEventSender) -> Self {
        let revisions = Arc::new(RevisionService::new(db.clone(), config.revisions.clone()));
        Self {
            db,
            config,
            events: EventDetector::new(event_tx),
            revisions,
            http_client: reqwest::Client::new(),
        }
    }
}
