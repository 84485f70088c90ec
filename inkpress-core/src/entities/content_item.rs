//! Live content items: the mutable side of the revisioning boundary.
//!
//! The revisioning service only needs to read an entity's current snapshot
//! and write one back during restore, so it talks to the [`ContentStore`]
//! trait rather than to this table directly. The Postgres implementation
//! lives here; tests use an in-memory store.

use crate::entities::EntityType;
use crate::framework::DatabaseProcessor;
use crate::revisions::ContentSnapshot;
use async_trait::async_trait;
use kanau::processor::Processor;
use uuid::Uuid;

/// A live (mutable) content item row.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ContentItem {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: serde_json::Value,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub featured_image: Option<String>,
    pub additional: serde_json::Value,
    pub deleted_at: Option<time::PrimitiveDateTime>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl ContentItem {
    /// The hashed snapshot fields of this item's current state.
    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            content: Some(self.content.clone()),
            meta_title: self.meta_title.clone(),
            meta_description: self.meta_description.clone(),
            featured_image: self.featured_image.clone(),
        }
    }
}

/// Persistence boundary consumed by the revisioning service.
///
/// Restore loads the live entity and writes a past snapshot back onto it;
/// everything else about entity persistence is out of revisioning scope.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Load a live entity; `None` if it does not exist or is soft-deleted.
    async fn load(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Option<ContentItem>, sqlx::Error>;

    /// Overwrite the entity's snapshot fields and persist.
    async fn apply_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        snapshot: &ContentSnapshot,
    ) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl ContentStore for DatabaseProcessor {
    async fn load(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Option<ContentItem>, sqlx::Error> {
        self.process(GetContentItem {
            entity_type,
            entity_id,
        })
        .await
    }

    async fn apply_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        snapshot: &ContentSnapshot,
    ) -> Result<(), sqlx::Error> {
        self.process(WriteContentSnapshot {
            entity_type,
            entity_id,
            snapshot: snapshot.clone(),
        })
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
/// Load a live, non-deleted content item.
pub struct GetContentItem {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

impl Processor<GetContentItem> for DatabaseProcessor {
    type Output = Option<ContentItem>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetContentItem")]
    async fn process(&self, query: GetContentItem) -> Result<Option<ContentItem>, sqlx::Error> {
        sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT * FROM content_items
            WHERE entity_type = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(query.entity_type)
        .bind(query.entity_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Overwrite an item's snapshot fields (restore path).
pub struct WriteContentSnapshot {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub snapshot: ContentSnapshot,
}

impl Processor<WriteContentSnapshot> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:WriteContentSnapshot")]
    async fn process(&self, cmd: WriteContentSnapshot) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE content_items
            SET title = $3,
                excerpt = $4,
                content = $5,
                meta_title = $6,
                meta_description = $7,
                featured_image = $8,
                updated_at = NOW()
            WHERE entity_type = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(cmd.entity_type)
        .bind(cmd.entity_id)
        .bind(&cmd.snapshot.title)
        .bind(&cmd.snapshot.excerpt)
        .bind(cmd.snapshot.content.clone().unwrap_or(serde_json::Value::Null))
        .bind(&cmd.snapshot.meta_title)
        .bind(&cmd.snapshot.meta_description)
        .bind(&cmd.snapshot.featured_image)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
