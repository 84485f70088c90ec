pub mod content_item;
pub mod content_revision;
pub mod webhook_subscription;

use inkpress_sdk::objects::EntityKind;

/// Revisionable entity type for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `inkpress_sdk::objects::EntityKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "entity_type")]
pub enum EntityType {
    Page,
    Post,
    Category,
    Media,
}

impl From<EntityType> for EntityKind {
    fn from(value: EntityType) -> Self {
        match value {
            EntityType::Page => EntityKind::Page,
            EntityType::Post => EntityKind::Post,
            EntityType::Category => EntityKind::Category,
            EntityType::Media => EntityKind::Media,
        }
    }
}

impl From<EntityKind> for EntityType {
    fn from(value: EntityKind) -> Self {
        match value {
            EntityKind::Page => EntityType::Page,
            EntityKind::Post => EntityType::Post,
            EntityKind::Category => EntityType::Category,
            EntityKind::Media => EntityType::Media,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind: EntityKind = (*self).into();
        f.write_str(kind.as_str())
    }
}

/// Check whether a database error is a unique-constraint violation
/// (Postgres SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
