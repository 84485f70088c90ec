//! Management API handlers.
//!
//! These endpoints are called by the CMS admin dashboard and require the
//! `Inkpress-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET    /content/{entity_type}/{entity_id}/revisions`                    – list revisions (paginated)
//! - `POST   /content/{entity_type}/{entity_id}/revisions`                    – manual snapshot of the live entity
//! - `GET    /content/{entity_type}/{entity_id}/revisions/{number}`           – fetch one revision
//! - `POST   /content/{entity_type}/{entity_id}/revisions/{number}/restore`   – restore a revision
//! - `GET    /webhooks`                                                       – list subscriptions
//! - `POST   /webhooks`                                                       – register a subscription
//! - `GET    /webhooks/{subscription_id}`                                     – fetch one subscription
//! - `PATCH  /webhooks/{subscription_id}`                                     – update a subscription
//! - `DELETE /webhooks/{subscription_id}`                                     – remove a subscription
//! - `POST   /webhooks/{subscription_id}/test`                                – single-attempt test delivery

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::state::AppState;

mod create_subscription;
mod delete_subscription;
mod get_revision;
mod get_subscription;
mod list_revisions;
mod list_subscriptions;
mod restore_revision;
mod save_revision;
mod test_subscription;
mod update_subscription;

/// Build the Management API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/content/{entity_type}/{entity_id}/revisions",
            get(list_revisions::list_revisions).post(save_revision::save_revision),
        )
        .route(
            "/content/{entity_type}/{entity_id}/revisions/{revision_number}",
            get(get_revision::get_revision),
        )
        .route(
            "/content/{entity_type}/{entity_id}/revisions/{revision_number}/restore",
            post(restore_revision::restore_revision),
        )
        .route(
            "/webhooks",
            get(list_subscriptions::list_subscriptions)
                .post(create_subscription::create_subscription),
        )
        .route(
            "/webhooks/{subscription_id}",
            get(get_subscription::get_subscription)
                .patch(update_subscription::update_subscription)
                .delete(delete_subscription::delete_subscription),
        )
        .route(
            "/webhooks/{subscription_id}/test",
            post(test_subscription::test_subscription),
        )
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Management API handlers.
#[derive(Debug)]
pub(crate) enum ManageApiError {
    Database(sqlx::Error),
    NotFound(&'static str),
    InvalidEntityType,
    Validation(String),
    Conflict,
    Internal,
}

impl IntoResponse for ManageApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ManageApiError::Database(e) => {
                tracing::error!(error = %e, "Management API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            ManageApiError::NotFound(what) => (StatusCode::NOT_FOUND, what).into_response(),
            ManageApiError::InvalidEntityType => {
                (StatusCode::BAD_REQUEST, "unknown entity type").into_response()
            }
            ManageApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            ManageApiError::Conflict => (
                StatusCode::CONFLICT,
                "concurrent revision writes, please retry",
            )
                .into_response(),
            ManageApiError::Internal => {
                tracing::error!("Management API internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

impl From<inkpress_core::revisions::RevisionError> for ManageApiError {
    fn from(err: inkpress_core::revisions::RevisionError) -> Self {
        use inkpress_core::revisions::RevisionError;
        match err {
            RevisionError::Database(e) => ManageApiError::Database(e),
            RevisionError::RevisionNotFound { .. } => ManageApiError::NotFound("revision not found"),
            RevisionError::EntityNotFound { .. } => ManageApiError::NotFound("entity not found"),
            RevisionError::Conflict { .. } => ManageApiError::Conflict,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

use inkpress_core::entities::EntityType;
use inkpress_core::entities::content_revision::ContentRevision;
use inkpress_core::entities::webhook_subscription::WebhookSubscription;
use inkpress_sdk::objects::revisions::RevisionResponse;
use inkpress_sdk::objects::subscriptions::SubscriptionResponse;
use std::str::FromStr;

/// Parse the `{entity_type}` path segment.
pub(crate) fn parse_entity_type(raw: &str) -> Result<EntityType, ManageApiError> {
    inkpress_sdk::objects::EntityKind::from_str(raw)
        .map(Into::into)
        .map_err(|_| ManageApiError::InvalidEntityType)
}

pub(crate) fn revision_to_response(r: &ContentRevision) -> RevisionResponse {
    RevisionResponse {
        id: r.id,
        entity_type: r.entity_type.into(),
        entity_id: r.entity_id,
        author_id: r.author_id,
        title: r.title.clone(),
        excerpt: r.excerpt.clone(),
        content: r.content.clone(),
        meta_title: r.meta_title.clone(),
        meta_description: r.meta_description.clone(),
        featured_image: r.featured_image.clone(),
        additional: r.additional.clone(),
        revision_number: r.revision_number,
        content_hash: r.content_hash.clone(),
        is_manual: r.is_manual,
        notes: r.notes.clone(),
        created_at: r.created_at.assume_utc().unix_timestamp(),
    }
}

pub(crate) fn subscription_to_response(s: &WebhookSubscription) -> SubscriptionResponse {
    SubscriptionResponse {
        id: s.id,
        name: s.name.clone(),
        target_url: s.target_url.clone(),
        events: s.events.clone(),
        active: s.active,
        timeout_secs: s.timeout_secs,
        created_at: s.created_at.assume_utc().unix_timestamp(),
        updated_at: s.updated_at.assume_utc().unix_timestamp(),
    }
}

/// Reject target URLs that are not plain http(s).
pub(crate) fn check_target_url(url: &url::Url) -> Result<(), ManageApiError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ManageApiError::Validation(format!(
            "unsupported target_url scheme: {other}"
        ))),
    }
}
