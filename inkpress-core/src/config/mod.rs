//! Runtime configuration sections shared across the server.
//!
//! Sections live behind `Arc<RwLock<_>>` so a SIGHUP reload can swap them
//! without restarting; the webhook dispatcher's tunables are fixed at
//! startup and are not part of the shared set.

pub mod admin;

pub use admin::AdminConfig;

use crate::revisions::RevisionPolicy;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Reloadable configuration sections, each behind its own lock so readers
/// of one section never contend with writers of another.
#[derive(Clone)]
pub struct SharedConfig {
    pub admin: Arc<RwLock<AdminConfig>>,
    pub revisions: Arc<RwLock<RevisionPolicy>>,
}

impl SharedConfig {
    pub fn new(admin: AdminConfig, revisions: RevisionPolicy) -> Self {
        Self {
            admin: Arc::new(RwLock::new(admin)),
            revisions: Arc::new(RwLock::new(revisions)),
        }
    }
}
