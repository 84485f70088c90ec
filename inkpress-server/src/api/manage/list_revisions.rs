use axum::{
    Json,
    extract::{Path, Query},
    response::IntoResponse,
};
use inkpress_core::entities::content_revision::ListRevisions;
use inkpress_core::framework::DatabaseProcessor;
use inkpress_sdk::objects::{PageQuery, PageResponse};
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{ManageApiError, parse_entity_type, revision_to_response};

/// `GET /content/{entity_type}/{entity_id}/revisions` — revision history,
/// newest first.
pub async fn list_revisions(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ManageApiError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let page = page.clamped();
    let (revisions, total) = processor
        .process(ListRevisions {
            entity_type,
            entity_id,
            limit: page.limit(),
            offset: page.offset(),
        })
        .await
        .map_err(ManageApiError::Database)?;

    Ok(Json(PageResponse {
        items: revisions.iter().map(revision_to_response).collect(),
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}
