//! Immutable revision snapshots and the revision store operations.
//!
//! Revision numbers form a gapless ascending sequence per
//! (entity_type, entity_id), assigned under a per-entity advisory
//! transaction lock. The unique index on the
//! (entity_type, entity_id, revision_number) triple is the integrity
//! backstop if two writers ever race past the lock.

use crate::entities::{is_unique_violation, EntityType};
use crate::framework::DatabaseProcessor;
use crate::revisions::ContentSnapshot;
use async_trait::async_trait;
use kanau::processor::Processor;
use thiserror::Error;
use uuid::Uuid;

/// An immutable snapshot of a revisionable entity at a point in time.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ContentRevision {
    pub id: Uuid,
    pub entity_type: EntityType,
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
    pub created_at: time::PrimitiveDateTime,
}

impl ContentRevision {
    /// The hashed snapshot fields of this revision.
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

/// Data for appending a new revision; the number and hash are assigned by
/// the store/service, never by the caller.
#[derive(Debug, Clone)]
pub struct NewRevision {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub author_id: Option<Uuid>,
    pub snapshot: ContentSnapshot,
    pub additional: serde_json::Value,
    pub content_hash: String,
    pub is_manual: bool,
    pub notes: Option<String>,
}

/// Errors from revision store operations.
#[derive(Debug, Error)]
pub enum RevisionStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Two writers raced past the per-entity serialization; the caller
    /// should retry the whole capture once.
    #[error("revision {revision_number} already exists for {entity_type} {entity_id}")]
    DuplicateRevisionNumber {
        entity_type: EntityType,
        entity_id: Uuid,
        revision_number: i32,
    },
}

/// Derive a stable advisory-lock key for one entity.
///
/// First eight big-endian bytes of SHA-256 over `"{type}:{id}"`, so every
/// process computes the same key without a shared registry.
fn advisory_lock_key(entity_type: EntityType, entity_id: Uuid) -> i64 {
    let data = format!("{entity_type}:{entity_id}");
    let digest = ring::digest::digest(&ring::digest::SHA256, data.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_ref()[..8]);
    i64::from_be_bytes(bytes)
}

impl ContentRevision {
    /// Take the per-entity advisory lock for the current transaction.
    ///
    /// Serializes number assignment among concurrent writers of the same
    /// entity without blocking writers of other entities. Released
    /// automatically at commit or rollback.
    pub async fn lock_entity_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(advisory_lock_key(entity_type, entity_id))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Next revision number for an entity: 1 + current max, 1 if none.
    ///
    /// Must be called after [`lock_entity_tx`](Self::lock_entity_tx) in the
    /// same transaction, otherwise two callers can read the same maximum.
    pub async fn next_revision_number_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<i32, sqlx::Error> {
        let next: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(revision_number), 0) + 1
            FROM content_revisions
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(next)
    }

    /// Insert a revision row with an already-assigned number.
    ///
    /// Fails with [`RevisionStoreError::DuplicateRevisionNumber`] if the
    /// triple already exists.
    pub async fn append_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        new: &NewRevision,
        revision_number: i32,
    ) -> Result<ContentRevision, RevisionStoreError> {
        let result = sqlx::query_as::<_, ContentRevision>(
            r#"
            INSERT INTO content_revisions
                (id, entity_type, entity_id, author_id, title, excerpt, content,
                 meta_title, meta_description, featured_image, additional,
                 revision_number, content_hash, is_manual, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.entity_type)
        .bind(new.entity_id)
        .bind(new.author_id)
        .bind(&new.snapshot.title)
        .bind(&new.snapshot.excerpt)
        .bind(new.snapshot.content.clone().unwrap_or(serde_json::Value::Null))
        .bind(&new.snapshot.meta_title)
        .bind(&new.snapshot.meta_description)
        .bind(&new.snapshot.featured_image)
        .bind(&new.additional)
        .bind(revision_number)
        .bind(&new.content_hash)
        .bind(new.is_manual)
        .bind(&new.notes)
        .fetch_one(&mut **tx)
        .await;

        match result {
            Ok(revision) => Ok(revision),
            Err(e) if is_unique_violation(&e) => Err(RevisionStoreError::DuplicateRevisionNumber {
                entity_type: new.entity_type,
                entity_id: new.entity_id,
                revision_number,
            }),
            Err(e) => Err(RevisionStoreError::Database(e)),
        }
    }
}

/// Store boundary consumed by the revisioning service.
///
/// The service only ever reads the latest revision, fetches one by number,
/// and appends; everything else about revisions (listing, cascade deletion)
/// is outside its orbit. The Postgres implementation delegates to the
/// command objects below; tests substitute an in-memory store.
#[async_trait]
pub trait RevisionStore: Send + Sync {
    /// The most recent revision for an entity, if any.
    async fn latest(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Option<ContentRevision>, sqlx::Error>;

    /// One revision by number.
    async fn get(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        revision_number: i32,
    ) -> Result<Option<ContentRevision>, sqlx::Error>;

    /// Append a revision with the store-assigned next number.
    async fn append(&self, new: NewRevision) -> Result<ContentRevision, RevisionStoreError>;
}

#[async_trait]
impl RevisionStore for DatabaseProcessor {
    async fn latest(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Option<ContentRevision>, sqlx::Error> {
        self.process(GetLatestRevision {
            entity_type,
            entity_id,
        })
        .await
    }

    async fn get(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        revision_number: i32,
    ) -> Result<Option<ContentRevision>, sqlx::Error> {
        self.process(GetRevision {
            entity_type,
            entity_id,
            revision_number,
        })
        .await
    }

    async fn append(&self, new: NewRevision) -> Result<ContentRevision, RevisionStoreError> {
        self.process(AppendRevision { new }).await
    }
}

// ---------------------------------------------------------------------------
// Store commands and queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
/// Append a revision: lock the entity, assign the next number, insert.
///
/// The whole read-increment-write runs in one transaction so numbers stay
/// gapless under concurrency.
pub struct AppendRevision {
    pub new: NewRevision,
}

impl Processor<AppendRevision> for DatabaseProcessor {
    type Output = ContentRevision;
    type Error = RevisionStoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:AppendRevision")]
    async fn process(&self, cmd: AppendRevision) -> Result<ContentRevision, RevisionStoreError> {
        let mut tx = self.pool.begin().await.map_err(RevisionStoreError::Database)?;

        ContentRevision::lock_entity_tx(&mut tx, cmd.new.entity_type, cmd.new.entity_id)
            .await
            .map_err(RevisionStoreError::Database)?;
        let number =
            ContentRevision::next_revision_number_tx(&mut tx, cmd.new.entity_type, cmd.new.entity_id)
                .await
                .map_err(RevisionStoreError::Database)?;
        let revision = ContentRevision::append_tx(&mut tx, &cmd.new, number).await?;

        tx.commit().await.map_err(RevisionStoreError::Database)?;
        Ok(revision)
    }
}

#[derive(Debug, Clone, Copy)]
/// Get the most recent revision for an entity, if any.
pub struct GetLatestRevision {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

impl Processor<GetLatestRevision> for DatabaseProcessor {
    type Output = Option<ContentRevision>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetLatestRevision")]
    async fn process(&self, query: GetLatestRevision) -> Result<Option<ContentRevision>, sqlx::Error> {
        sqlx::query_as::<_, ContentRevision>(
            r#"
            SELECT * FROM content_revisions
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY revision_number DESC
            LIMIT 1
            "#,
        )
        .bind(query.entity_type)
        .bind(query.entity_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Get one revision by number.
pub struct GetRevision {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub revision_number: i32,
}

impl Processor<GetRevision> for DatabaseProcessor {
    type Output = Option<ContentRevision>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetRevision")]
    async fn process(&self, query: GetRevision) -> Result<Option<ContentRevision>, sqlx::Error> {
        sqlx::query_as::<_, ContentRevision>(
            r#"
            SELECT * FROM content_revisions
            WHERE entity_type = $1 AND entity_id = $2 AND revision_number = $3
            "#,
        )
        .bind(query.entity_type)
        .bind(query.entity_id)
        .bind(query.revision_number)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// List revisions for an entity, newest first, with total count.
pub struct ListRevisions {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListRevisions> for DatabaseProcessor {
    type Output = (Vec<ContentRevision>, i64);
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListRevisions")]
    async fn process(&self, query: ListRevisions) -> Result<(Vec<ContentRevision>, i64), sqlx::Error> {
        let revisions = sqlx::query_as::<_, ContentRevision>(
            r#"
            SELECT * FROM content_revisions
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY revision_number DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.entity_type)
        .bind(query.entity_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM content_revisions WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(query.entity_type)
        .bind(query.entity_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((revisions, total))
    }
}

#[derive(Debug, Clone, Copy)]
/// Hard-delete all revisions of an entity.
///
/// Only valid as a cascade of entity hard-deletion; revisions are never
/// deleted individually.
pub struct DeleteRevisionsForEntity {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

impl Processor<DeleteRevisionsForEntity> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteRevisionsForEntity")]
    async fn process(&self, cmd: DeleteRevisionsForEntity) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM content_revisions WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(cmd.entity_type)
        .bind(cmd.entity_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_lock_key_is_stable_and_entity_scoped() {
        let id = Uuid::from_u128(42);
        let other = Uuid::from_u128(43);
        assert_eq!(
            advisory_lock_key(EntityType::Page, id),
            advisory_lock_key(EntityType::Page, id)
        );
        assert_ne!(
            advisory_lock_key(EntityType::Page, id),
            advisory_lock_key(EntityType::Post, id)
        );
        assert_ne!(
            advisory_lock_key(EntityType::Page, id),
            advisory_lock_key(EntityType::Page, other)
        );
    }
}
