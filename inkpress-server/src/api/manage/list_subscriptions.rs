use axum::{Json, response::IntoResponse};
use inkpress_core::entities::webhook_subscription::ListWebhookSubscriptions;
use inkpress_core::framework::DatabaseProcessor;
use kanau::processor::Processor;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, subscription_to_response};

/// `GET /webhooks` — list all registered subscriptions, newest first.
/// Secrets are never included.
pub async fn list_subscriptions(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, ManageApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let subscriptions = processor
        .process(ListWebhookSubscriptions)
        .await
        .map_err(ManageApiError::Database)?;

    let response: Vec<_> = subscriptions.iter().map(subscription_to_response).collect();
    Ok(Json(response))
}
