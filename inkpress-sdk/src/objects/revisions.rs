//! Revision objects for the management API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityKind;

/// A single immutable revision as returned by the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionResponse {
    pub id: Uuid,
    pub entity_type: EntityKind,
    pub entity_id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: serde_json::Value,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub featured_image: Option<String>,
    pub additional: serde_json::Value,
    pub revision_number: i32,
    pub content_hash: String,
    pub is_manual: bool,
    pub notes: Option<String>,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

/// Request body for an explicit manual snapshot of the live entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualSaveRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of restoring a revision onto the live entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreRevisionResponse {
    pub entity_type: EntityKind,
    pub entity_id: Uuid,
    /// The revision number that was restored.
    pub restored_from: i32,
    /// The manual revision recording the restore, if one was written
    /// (restoring to the current revision may skip it by configuration).
    pub new_revision: Option<i32>,
}
