use axum::{Json, extract::Path, response::IntoResponse};
use inkpress_core::entities::webhook_subscription::GetWebhookSubscription;
use inkpress_core::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, subscription_to_response};

/// `GET /webhooks/{subscription_id}` — fetch one subscription. The secret
/// is never included.
pub async fn get_subscription(
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

    Ok(Json(subscription_to_response(&subscription)))
}
