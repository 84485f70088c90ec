//! Content revisioning: fingerprinting, capture policy, and restore.

pub mod fingerprint;
pub mod service;

pub use fingerprint::ContentSnapshot;
pub use service::{CaptureMode, RestoreOutcome, RevisionError, RevisionPolicy, RevisionService};
