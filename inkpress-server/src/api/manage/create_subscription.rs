use axum::{Json, response::IntoResponse};
use inkpress_core::entities::webhook_subscription::{
    InsertWebhookSubscription, NewWebhookSubscription,
};
use inkpress_core::framework::DatabaseProcessor;
use inkpress_sdk::objects::subscriptions::{CreateSubscriptionResponse, clamp_timeout};
use inkpress_sdk::objects::CreateSubscriptionRequest;
use inkpress_sdk::signature::generate_secret;
use kanau::processor::Processor;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, check_target_url, subscription_to_response};

/// `POST /webhooks` — register a webhook subscription.
///
/// When no secret is supplied the server generates one, returned here and
/// never again.
pub async fn create_subscription(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, ManageApiError> {
    if request.name.trim().is_empty() {
        return Err(ManageApiError::Validation(
            "subscription name must not be empty".to_string(),
        ));
    }
    if request.events.is_empty() {
        return Err(ManageApiError::Validation(
            "subscription must select at least one event pattern".to_string(),
        ));
    }
    check_target_url(&request.target_url)?;

    let secret = match request.secret.filter(|s| !s.is_empty()) {
        Some(secret) => secret,
        None => generate_secret(),
    };

    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };
    let subscription = processor
        .process(InsertWebhookSubscription {
            new: NewWebhookSubscription {
                name: request.name,
                target_url: request.target_url.to_string(),
                events: request.events,
                active: request.active,
                timeout_secs: clamp_timeout(request.timeout_secs),
                secret: secret.clone(),
            },
        })
        .await
        .map_err(ManageApiError::Database)?;

    Ok(Json(CreateSubscriptionResponse {
        subscription: subscription_to_response(&subscription),
        secret,
    }))
}
