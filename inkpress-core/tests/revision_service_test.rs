//! Revisioning service orchestration against in-memory stores: gapless
//! numbering under concurrent writers, fingerprint dedup, the single retry
//! after a lost append race, and the restore round-trip.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use inkpress_core::entities::EntityType;
use inkpress_core::entities::content_item::{ContentItem, ContentStore};
use inkpress_core::entities::content_revision::{
    ContentRevision, NewRevision, RevisionStore, RevisionStoreError,
};
use inkpress_core::revisions::{
    CaptureMode, ContentSnapshot, RevisionError, RevisionPolicy, RevisionService,
};
use tokio::sync::RwLock;
use uuid::Uuid;

fn now() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}

/// Revision store backed by a vec, with the same numbering contract as the
/// Postgres store: the next number is assigned inside the append under the
/// store's own serialization. `failures_to_inject` makes the next N appends
/// lose the race.
#[derive(Clone, Default)]
struct InMemoryRevisionStore {
    rows: Arc<Mutex<Vec<ContentRevision>>>,
    append_calls: Arc<AtomicU32>,
    failures_to_inject: Arc<AtomicU32>,
}

impl InMemoryRevisionStore {
    fn inject_duplicate_failures(&self, count: u32) {
        self.failures_to_inject.store(count, Ordering::SeqCst);
    }

    fn numbers_for(&self, entity_type: EntityType, entity_id: Uuid) -> Vec<i32> {
        let rows = self.rows.lock().unwrap();
        let mut numbers: Vec<i32> = rows
            .iter()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .map(|r| r.revision_number)
            .collect();
        numbers.sort_unstable();
        numbers
    }
}

#[async_trait]
impl RevisionStore for InMemoryRevisionStore {
    async fn latest(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Option<ContentRevision>, sqlx::Error> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .max_by_key(|r| r.revision_number)
            .cloned())
    }

    async fn get(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        revision_number: i32,
    ) -> Result<Option<ContentRevision>, sqlx::Error> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| {
                r.entity_type == entity_type
                    && r.entity_id == entity_id
                    && r.revision_number == revision_number
            })
            .cloned())
    }

    async fn append(&self, new: NewRevision) -> Result<ContentRevision, RevisionStoreError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock().unwrap();
        let next = rows
            .iter()
            .filter(|r| r.entity_type == new.entity_type && r.entity_id == new.entity_id)
            .map(|r| r.revision_number)
            .max()
            .unwrap_or(0)
            + 1;

        if self
            .failures_to_inject
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RevisionStoreError::DuplicateRevisionNumber {
                entity_type: new.entity_type,
                entity_id: new.entity_id,
                revision_number: next,
            });
        }

        let revision = ContentRevision {
            id: Uuid::new_v4(),
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            author_id: new.author_id,
            title: new.snapshot.title,
            excerpt: new.snapshot.excerpt,
            content: new.snapshot.content.unwrap_or(serde_json::Value::Null),
            meta_title: new.snapshot.meta_title,
            meta_description: new.snapshot.meta_description,
            featured_image: new.snapshot.featured_image,
            additional: new.additional,
            revision_number: next,
            content_hash: new.content_hash,
            is_manual: new.is_manual,
            notes: new.notes,
            created_at: now(),
        };
        rows.push(revision.clone());
        Ok(revision)
    }
}

/// Single-entity in-memory content store for exercising restore.
#[derive(Clone)]
struct InMemoryContentStore {
    item: Arc<Mutex<ContentItem>>,
}

impl InMemoryContentStore {
    fn new(item: ContentItem) -> Self {
        Self {
            item: Arc::new(Mutex::new(item)),
        }
    }

    fn current(&self) -> ContentItem {
        self.item.lock().unwrap().clone()
    }

    fn mutate(&self, f: impl FnOnce(&mut ContentItem)) {
        f(&mut self.item.lock().unwrap());
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn load(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Option<ContentItem>, sqlx::Error> {
        let item = self.item.lock().unwrap();
        if item.entity_type == entity_type && item.id == entity_id && item.deleted_at.is_none() {
            Ok(Some(item.clone()))
        } else {
            Ok(None)
        }
    }

    async fn apply_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        snapshot: &ContentSnapshot,
    ) -> Result<(), sqlx::Error> {
        let mut item = self.item.lock().unwrap();
        if item.entity_type == entity_type && item.id == entity_id {
            item.title = snapshot.title.clone();
            item.excerpt = snapshot.excerpt.clone();
            item.content = snapshot.content.clone().unwrap_or(serde_json::Value::Null);
            item.meta_title = snapshot.meta_title.clone();
            item.meta_description = snapshot.meta_description.clone();
            item.featured_image = snapshot.featured_image.clone();
            item.updated_at = now();
        }
        Ok(())
    }
}

fn item(entity_id: Uuid, title: &str, body: &str) -> ContentItem {
    ContentItem {
        id: entity_id,
        entity_type: EntityType::Post,
        title: Some(title.to_string()),
        excerpt: None,
        content: serde_json::json!({ "body": body }),
        meta_title: None,
        meta_description: None,
        featured_image: None,
        additional: serde_json::json!({}),
        deleted_at: None,
        created_at: now(),
        updated_at: now(),
    }
}

fn service(
    store: InMemoryRevisionStore,
    policy: RevisionPolicy,
) -> RevisionService<InMemoryRevisionStore> {
    RevisionService::with_store(store, Arc::new(RwLock::new(policy)))
}

#[tokio::test]
async fn concurrent_manual_captures_number_gaplessly() {
    let store = InMemoryRevisionStore::default();
    let svc = Arc::new(service(store.clone(), RevisionPolicy::default()));
    let entity_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for i in 0..8 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            let snapshot = ContentSnapshot {
                title: Some(format!("draft {i}")),
                excerpt: None,
                content: Some(serde_json::json!({ "body": i })),
                meta_title: None,
                meta_description: None,
                featured_image: None,
            };
            svc.record_if_changed(
                EntityType::Post,
                entity_id,
                &snapshot,
                &serde_json::json!({}),
                None,
                CaptureMode::Manual { notes: None },
            )
            .await
        }));
    }

    let mut written = Vec::new();
    for handle in handles {
        let revision = handle.await.unwrap().unwrap().unwrap();
        written.push(revision.revision_number);
    }
    written.sort_unstable();

    assert_eq!(written, (1..=8).collect::<Vec<i32>>());
    assert_eq!(
        store.numbers_for(EntityType::Post, entity_id),
        (1..=8).collect::<Vec<i32>>()
    );
}

#[tokio::test]
async fn automatic_capture_dedups_unchanged_content() {
    let store = InMemoryRevisionStore::default();
    let svc = service(store.clone(), RevisionPolicy::default());
    let entity_id = Uuid::new_v4();
    let snapshot = item(entity_id, "hello", "world").snapshot();

    let first = svc
        .record_if_changed(
            EntityType::Post,
            entity_id,
            &snapshot,
            &serde_json::json!({}),
            None,
            CaptureMode::Automatic,
        )
        .await
        .unwrap();
    assert_eq!(first.unwrap().revision_number, 1);

    let second = svc
        .record_if_changed(
            EntityType::Post,
            entity_id,
            &snapshot,
            &serde_json::json!({}),
            None,
            CaptureMode::Automatic,
        )
        .await
        .unwrap();
    assert!(second.is_none());
    assert_eq!(store.numbers_for(EntityType::Post, entity_id), vec![1]);
}

#[tokio::test]
async fn capture_retries_once_after_losing_the_append_race() {
    let store = InMemoryRevisionStore::default();
    store.inject_duplicate_failures(1);
    let svc = service(store.clone(), RevisionPolicy::default());
    let entity_id = Uuid::new_v4();

    let revision = svc
        .record_if_changed(
            EntityType::Page,
            entity_id,
            &item(entity_id, "landing", "v1").snapshot(),
            &serde_json::json!({}),
            None,
            CaptureMode::Manual { notes: None },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(revision.revision_number, 1);
    assert_eq!(store.append_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn capture_conflict_after_retry_is_surfaced() {
    let store = InMemoryRevisionStore::default();
    store.inject_duplicate_failures(2);
    let svc = service(store.clone(), RevisionPolicy::default());
    let entity_id = Uuid::new_v4();

    let err = svc
        .record_if_changed(
            EntityType::Page,
            entity_id,
            &item(entity_id, "landing", "v1").snapshot(),
            &serde_json::json!({}),
            None,
            CaptureMode::Manual { notes: None },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RevisionError::Conflict { .. }));
    assert!(store.numbers_for(EntityType::Page, entity_id).is_empty());
}

#[tokio::test]
async fn restore_copies_snapshot_and_records_followup_revision() {
    let revisions = InMemoryRevisionStore::default();
    let svc = service(revisions.clone(), RevisionPolicy::default());
    let entity_id = Uuid::new_v4();
    let content = InMemoryContentStore::new(item(entity_id, "original title", "first draft"));

    svc.record_if_changed(
        EntityType::Post,
        entity_id,
        &content.current().snapshot(),
        &serde_json::json!({}),
        None,
        CaptureMode::Automatic,
    )
    .await
    .unwrap();

    content.mutate(|item| {
        item.title = Some("rewritten title".to_string());
        item.content = serde_json::json!({ "body": "second draft" });
    });
    svc.record_if_changed(
        EntityType::Post,
        entity_id,
        &content.current().snapshot(),
        &serde_json::json!({}),
        None,
        CaptureMode::Automatic,
    )
    .await
    .unwrap();

    let outcome = svc
        .restore(&content, EntityType::Post, entity_id, 1, None)
        .await
        .unwrap();

    let restored = content.current();
    assert_eq!(restored.title.as_deref(), Some("original title"));
    assert_eq!(restored.content, serde_json::json!({ "body": "first draft" }));

    assert_eq!(outcome.restored_from, 1);
    let new_revision = outcome.new_revision.unwrap();
    assert_eq!(new_revision.revision_number, 3);
    assert!(new_revision.is_manual);
    assert_eq!(
        new_revision.notes.as_deref(),
        Some("restored from revision 1")
    );
    assert_eq!(new_revision.title.as_deref(), Some("original title"));
    assert_eq!(
        revisions.numbers_for(EntityType::Post, entity_id),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn restore_of_missing_revision_is_not_found() {
    let revisions = InMemoryRevisionStore::default();
    let svc = service(revisions.clone(), RevisionPolicy::default());
    let entity_id = Uuid::new_v4();
    let content = InMemoryContentStore::new(item(entity_id, "only draft", "body"));

    let err = svc
        .restore(&content, EntityType::Post, entity_id, 99, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RevisionError::RevisionNotFound {
            revision_number: 99,
            ..
        }
    ));
    assert_eq!(content.current().title.as_deref(), Some("only draft"));
}

#[tokio::test]
async fn restore_to_current_skips_new_revision_when_policy_says_so() {
    let revisions = InMemoryRevisionStore::default();
    let svc = service(
        revisions.clone(),
        RevisionPolicy {
            record_restore_to_current: false,
        },
    );
    let entity_id = Uuid::new_v4();
    let content = InMemoryContentStore::new(item(entity_id, "stable", "body"));

    svc.record_if_changed(
        EntityType::Post,
        entity_id,
        &content.current().snapshot(),
        &serde_json::json!({}),
        None,
        CaptureMode::Automatic,
    )
    .await
    .unwrap();

    let outcome = svc
        .restore(&content, EntityType::Post, entity_id, 1, None)
        .await
        .unwrap();

    assert_eq!(outcome.restored_from, 1);
    assert!(outcome.new_revision.is_none());
    assert_eq!(revisions.numbers_for(EntityType::Post, entity_id), vec![1]);
}
