use axum::{Json, extract::Path, response::IntoResponse};
use inkpress_core::entities::content_revision::GetRevision;
use inkpress_core::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, parse_entity_type, revision_to_response};

/// `GET /content/{entity_type}/{entity_id}/revisions/{revision_number}` —
/// fetch a single revision including its full content snapshot.
pub async fn get_revision(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path((entity_type, entity_id, revision_number)): Path<(String, Uuid, i32)>,
) -> Result<impl IntoResponse, ManageApiError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let revision = processor
        .process(GetRevision {
            entity_type,
            entity_id,
            revision_number,
        })
        .await
        .map_err(ManageApiError::Database)?
        .ok_or(ManageApiError::NotFound("revision not found"))?;

    Ok(Json(revision_to_response(&revision)))
}
