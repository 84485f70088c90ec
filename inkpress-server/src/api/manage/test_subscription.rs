use axum::{Json, extract::Path, response::IntoResponse};
use inkpress_core::entities::webhook_subscription::GetWebhookSubscription;
use inkpress_core::framework::DatabaseProcessor;
use inkpress_core::processors::test_delivery;
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::ManageApiError;

/// `POST /webhooks/{subscription_id}/test` — fire a single synthetic
/// `webhook.test` delivery and report the raw outcome.
///
/// No retries: the operator is diagnosing the endpoint and wants the first
/// answer, not the eventual one. Works on inactive subscriptions too, so an
/// endpoint can be verified before being switched on.
pub async fn test_subscription(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ManageApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let subscription = processor
        .process(GetWebhookSubscription {
            id: subscription_id,
        })
        .await
        .map_err(ManageApiError::Database)?
        .ok_or(ManageApiError::NotFound("subscription not found"))?;

    let outcome = test_delivery(&state.http_client, &subscription).await;
    Ok(Json(outcome))
}
