use axum::{Json, extract::Path, response::IntoResponse};
use inkpress_core::framework::DatabaseProcessor;
use inkpress_sdk::objects::events::{EventKind, EventType};
use inkpress_sdk::objects::RestoreRevisionResponse;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, parse_entity_type};

/// `POST /content/{entity_type}/{entity_id}/revisions/{revision_number}/restore`
/// — copy a revision's snapshot back onto the live entity.
///
/// Emits the `{entity}.restored` event after the restore (and its audit
/// revision) has committed.
///
/// The restore actor is left unset on purpose: admin authentication is a
/// shared secret, so there is no per-user identity to attribute the restore
/// to until user-level authentication exists.
pub async fn restore_revision(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path((entity_type, entity_id, revision_number)): Path<(String, Uuid, i32)>,
) -> Result<impl IntoResponse, ManageApiError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let store = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let outcome = state
        .revisions
        .restore(&store, entity_type, entity_id, revision_number, None)
        .await?;

    let new_revision = outcome.new_revision.as_ref().map(|r| r.revision_number);
    state
        .events
        .emit(
            EventType::new(entity_type.into(), EventKind::Restored),
            entity_id,
            serde_json::json!({
                "entity_type": entity_type.to_string(),
                "entity_id": entity_id,
                "restored_from": outcome.restored_from,
                "new_revision": new_revision,
            }),
        )
        .await;

    Ok(Json(RestoreRevisionResponse {
        entity_type: entity_type.into(),
        entity_id,
        restored_from: outcome.restored_from,
        new_revision,
    }))
}
