//! Revisioning service: decides when a mutation becomes a revision, and
//! restores past revisions onto the live entity.
//!
//! Capture policy:
//! - manual captures always write a new revision, even when content is
//!   identical to the latest (an explicit user request is itself worth
//!   recording);
//! - automatic captures write only when the fingerprint differs from the
//!   latest revision's, or when no revision exists yet, so no-op saves do
//!   not flood the history.

use crate::entities::content_item::ContentStore;
use crate::entities::content_revision::{
    ContentRevision, NewRevision, RevisionStore, RevisionStoreError,
};
use crate::entities::EntityType;
use crate::framework::DatabaseProcessor;
use crate::revisions::ContentSnapshot;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a capture was requested.
///
/// An enum rather than a bare boolean so further capture modes (scheduled
/// snapshots, import checkpoints) can be added without touching call sites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CaptureMode {
    /// Implicit capture on entity mutation; deduplicated by fingerprint.
    #[default]
    Automatic,
    /// Explicit user-requested snapshot; always written.
    Manual { notes: Option<String> },
}

impl CaptureMode {
    pub fn is_manual(&self) -> bool {
        matches!(self, CaptureMode::Manual { .. })
    }

    fn into_notes(self) -> Option<String> {
        match self {
            CaptureMode::Automatic => None,
            CaptureMode::Manual { notes } => notes,
        }
    }
}

/// Product-policy switches for the revisioning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionPolicy {
    /// Whether restoring the currently-latest revision still records a new
    /// manual revision documenting the restore. Product decision, so
    /// configurable rather than hardcoded.
    pub record_restore_to_current: bool,
}

impl Default for RevisionPolicy {
    fn default() -> Self {
        Self {
            record_restore_to_current: true,
        }
    }
}

/// Errors surfaced by the revisioning service.
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested revision does not exist; client-visible, no retry.
    #[error("revision {revision_number} not found for {entity_type} {entity_id}")]
    RevisionNotFound {
        entity_type: EntityType,
        entity_id: Uuid,
        revision_number: i32,
    },

    /// The entity itself does not exist (or is soft-deleted).
    #[error("{entity_type} {entity_id} not found")]
    EntityNotFound {
        entity_type: EntityType,
        entity_id: Uuid,
    },

    /// Both the capture and its single retry lost the append race.
    #[error("concurrent revision writes for {entity_type} {entity_id}, retry exhausted")]
    Conflict {
        entity_type: EntityType,
        entity_id: Uuid,
    },
}

/// Result of restoring a revision.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// The revision number whose snapshot was copied onto the entity.
    pub restored_from: i32,
    /// The manual revision recording the restore, when one was written.
    pub new_revision: Option<ContentRevision>,
}

/// Decide whether a capture should produce a new revision.
///
/// Pure so the policy is testable without a store: manual always writes,
/// automatic writes on first capture or fingerprint change.
pub fn should_record(is_manual: bool, latest_hash: Option<&str>, new_hash: &str) -> bool {
    if is_manual {
        return true;
    }
    match latest_hash {
        None => true,
        Some(latest) => latest != new_hash,
    }
}

/// Orchestrates fingerprinting, dedup, numbering, and restore.
///
/// Generic over the [`RevisionStore`] so the orchestration (dedup, retry,
/// restore round-trip) can be exercised against an in-memory store; the
/// server always runs it against Postgres via the default parameter.
pub struct RevisionService<S: RevisionStore = DatabaseProcessor> {
    store: S,
    policy: Arc<RwLock<RevisionPolicy>>,
}

impl RevisionService {
    pub fn new(pool: sqlx::PgPool, policy: Arc<RwLock<RevisionPolicy>>) -> Self {
        Self {
            store: DatabaseProcessor::new(pool),
            policy,
        }
    }
}

impl<S: RevisionStore> RevisionService<S> {
    pub fn with_store(store: S, policy: Arc<RwLock<RevisionPolicy>>) -> Self {
        Self { store, policy }
    }

    /// Capture a revision of `snapshot` if the capture policy calls for one.
    ///
    /// Returns the written revision, or `None` when an automatic capture was
    /// deduplicated against the latest revision. A lost append race (another
    /// writer took the assigned number first) is retried once with fresh
    /// state before surfacing as [`RevisionError::Conflict`].
    pub async fn record_if_changed(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        snapshot: &ContentSnapshot,
        additional: &serde_json::Value,
        author_id: Option<Uuid>,
        capture: CaptureMode,
    ) -> Result<Option<ContentRevision>, RevisionError> {
        let content_hash = snapshot.fingerprint();
        let is_manual = capture.is_manual();
        let notes = capture.into_notes();

        for attempt in 0..2u8 {
            let latest = self.store.latest(entity_type, entity_id).await?;

            if !should_record(is_manual, latest.as_ref().map(|r| r.content_hash.as_str()), &content_hash) {
                debug!(
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    content_hash = %content_hash,
                    "Skipping no-op automatic capture"
                );
                return Ok(None);
            }

            let new = NewRevision {
                entity_type,
                entity_id,
                author_id,
                snapshot: snapshot.clone(),
                additional: additional.clone(),
                content_hash: content_hash.clone(),
                is_manual,
                notes: notes.clone(),
            };

            match self.store.append(new).await {
                Ok(revision) => {
                    info!(
                        entity_type = %entity_type,
                        entity_id = %entity_id,
                        revision_number = revision.revision_number,
                        is_manual,
                        "Revision recorded"
                    );
                    return Ok(Some(revision));
                }
                Err(RevisionStoreError::DuplicateRevisionNumber { revision_number, .. })
                    if attempt == 0 =>
                {
                    // Transient conflict: another writer won the number.
                    warn!(
                        entity_type = %entity_type,
                        entity_id = %entity_id,
                        revision_number,
                        "Revision number conflict, retrying capture once"
                    );
                }
                Err(RevisionStoreError::DuplicateRevisionNumber { .. }) => {
                    return Err(RevisionError::Conflict {
                        entity_type,
                        entity_id,
                    });
                }
                Err(RevisionStoreError::Database(e)) => return Err(RevisionError::Database(e)),
            }
        }

        Err(RevisionError::Conflict {
            entity_type,
            entity_id,
        })
    }

    /// Restore revision `revision_number` onto the live entity.
    ///
    /// Copies the revision's snapshot fields onto the entity, persists it
    /// through `store`, then records a manual revision documenting the
    /// restore — so a restore is always auditable and the pre-restore state
    /// (already captured on the prior mutation) is never lost. Restoring the
    /// currently-latest revision skips the new revision when the policy says
    /// so.
    pub async fn restore(
        &self,
        store: &dyn ContentStore,
        entity_type: EntityType,
        entity_id: Uuid,
        revision_number: i32,
        actor: Option<Uuid>,
    ) -> Result<RestoreOutcome, RevisionError> {
        let revision = self
            .store
            .get(entity_type, entity_id, revision_number)
            .await?
            .ok_or(RevisionError::RevisionNotFound {
                entity_type,
                entity_id,
                revision_number,
            })?;

        let latest = self.store.latest(entity_type, entity_id).await?;
        let restoring_latest = latest
            .as_ref()
            .is_some_and(|l| l.revision_number == revision_number);

        let snapshot = revision.snapshot();
        store
            .apply_snapshot(entity_type, entity_id, &snapshot)
            .await?;

        let item = store
            .load(entity_type, entity_id)
            .await?
            .ok_or(RevisionError::EntityNotFound {
                entity_type,
                entity_id,
            })?;

        let record_even_if_current = self.policy.read().await.record_restore_to_current;
        if restoring_latest && !record_even_if_current {
            info!(
                entity_type = %entity_type,
                entity_id = %entity_id,
                revision_number,
                "Restored current revision; policy skips the restore revision"
            );
            return Ok(RestoreOutcome {
                restored_from: revision_number,
                new_revision: None,
            });
        }

        let new_revision = self
            .record_if_changed(
                entity_type,
                entity_id,
                &item.snapshot(),
                &item.additional,
                actor,
                CaptureMode::Manual {
                    notes: Some(format!("restored from revision {revision_number}")),
                },
            )
            .await?;

        Ok(RestoreOutcome {
            restored_from: revision_number,
            new_revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_capture_always_records() {
        assert!(should_record(true, None, "abc"));
        assert!(should_record(true, Some("abc"), "abc"));
        assert!(should_record(true, Some("abc"), "def"));
    }

    #[test]
    fn automatic_capture_records_first_revision() {
        assert!(should_record(false, None, "abc"));
    }

    #[test]
    fn automatic_capture_dedups_identical_content() {
        assert!(!should_record(false, Some("abc"), "abc"));
        assert!(should_record(false, Some("abc"), "def"));
    }

    #[test]
    fn capture_mode_notes() {
        assert_eq!(CaptureMode::Automatic.into_notes(), None);
        assert_eq!(
            CaptureMode::Manual {
                notes: Some("pre-launch".into())
            }
            .into_notes(),
            Some("pre-launch".into())
        );
        assert!(!CaptureMode::Automatic.is_manual());
        assert!(CaptureMode::Manual { notes: None }.is_manual());
    }
}
