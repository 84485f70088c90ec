use axum::{Json, extract::Path, response::IntoResponse};
use inkpress_core::entities::webhook_subscription::{
    UpdateWebhookSubscription, WebhookSubscriptionUpdate,
};
use inkpress_core::framework::DatabaseProcessor;
use inkpress_sdk::objects::subscriptions::clamp_timeout;
use inkpress_sdk::objects::UpdateSubscriptionRequest;
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, check_target_url, subscription_to_response};

/// `PATCH /webhooks/{subscription_id}` — partial update; absent fields are
/// left unchanged.
pub async fn update_subscription(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path(subscription_id): Path<Uuid>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> Result<impl IntoResponse, ManageApiError> {
    if request.events.as_ref().is_some_and(|events| events.is_empty()) {
        return Err(ManageApiError::Validation(
            "subscription must select at least one event pattern".to_string(),
        ));
    }
    if let Some(url) = &request.target_url {
        check_target_url(url)?;
    }

    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };
    let subscription = processor
        .process(UpdateWebhookSubscription {
            id: subscription_id,
            update: WebhookSubscriptionUpdate {
                name: request.name,
                target_url: request.target_url.map(|u| u.to_string()),
                events: request.events,
                active: request.active,
                timeout_secs: request.timeout_secs.map(clamp_timeout),
                secret: request.secret.filter(|s| !s.is_empty()),
            },
        })
        .await
        .map_err(ManageApiError::Database)?
        .ok_or(ManageApiError::NotFound("subscription not found"))?;

    Ok(Json(subscription_to_response(&subscription)))
}
