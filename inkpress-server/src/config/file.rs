//! TOML file configuration structures.
//!
//! These structs directly map to the `inkpress-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub revisions: RevisionsConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Revisioning policy section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionsConfig {
    /// Whether restoring the currently-latest revision still records a new
    /// manual revision documenting the restore.
    #[serde(default = "default_true")]
    pub record_restore_to_current: bool,
}

impl Default for RevisionsConfig {
    fn default() -> Self {
        Self {
            record_restore_to_current: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Webhook dispatcher tunables. Fixed at startup, not reloadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhooksConfig {
    /// Delivery attempts per matched subscription (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the second attempt, in seconds; doubles per failure.
    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: u64,
    /// Concurrent delivery tasks across all events.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_secs: default_base_backoff_secs(),
            workers: default_workers(),
        }
    }
}

fn default_max_attempts() -> u32 {
    inkpress_core::processors::webhook_dispatcher::DEFAULT_MAX_ATTEMPTS
}

fn default_base_backoff_secs() -> u64 {
    inkpress_core::processors::webhook_dispatcher::DEFAULT_BASE_BACKOFF.as_secs()
}

fn default_workers() -> usize {
    inkpress_core::processors::webhook_dispatcher::DEFAULT_WORKERS
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}
