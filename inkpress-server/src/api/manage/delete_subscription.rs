use axum::{extract::Path, http::StatusCode, response::IntoResponse};
use inkpress_core::entities::webhook_subscription::DeleteWebhookSubscription;
use inkpress_core::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::ManageApiError;

/// `DELETE /webhooks/{subscription_id}` — remove a subscription.
///
/// Deliveries already in flight for this subscription are unaffected; the
/// next event simply no longer matches it.
pub async fn delete_subscription(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ManageApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let deleted = processor
        .process(DeleteWebhookSubscription {
            id: subscription_id,
        })
        .await
        .map_err(ManageApiError::Database)?;

    if !deleted {
        return Err(ManageApiError::NotFound("subscription not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
