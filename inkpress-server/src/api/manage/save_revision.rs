use axum::{Json, extract::Path, response::IntoResponse};
use inkpress_core::entities::content_item::GetContentItem;
use inkpress_core::framework::DatabaseProcessor;
use inkpress_core::revisions::CaptureMode;
use inkpress_sdk::objects::ManualSaveRequest;
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, parse_entity_type, revision_to_response};

/// `POST /content/{entity_type}/{entity_id}/revisions` — explicit manual
/// snapshot of the live entity's current state.
///
/// Manual captures are never deduplicated: asking for a snapshot always
/// produces one, even if nothing changed since the latest revision.
///
/// The revision's author is left unset on purpose: admin authentication is
/// a shared secret, so there is no per-user identity to attribute the
/// capture to until user-level authentication exists.
pub async fn save_revision(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
    Json(request): Json<ManualSaveRequest>,
) -> Result<impl IntoResponse, ManageApiError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let item = processor
        .process(GetContentItem {
            entity_type,
            entity_id,
        })
        .await
        .map_err(ManageApiError::Database)?
        .ok_or(ManageApiError::NotFound("entity not found"))?;

    let revision = state
        .revisions
        .record_if_changed(
            entity_type,
            entity_id,
            &item.snapshot(),
            &item.additional,
            None,
            CaptureMode::Manual {
                notes: request.notes,
            },
        )
        .await?
        // Manual captures always write; a missing revision here is a bug.
        .ok_or(ManageApiError::Internal)?;

    Ok(Json(revision_to_response(&revision)))
}
