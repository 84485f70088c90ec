//! Configuration module for inkpress-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{AdminConfig, ServerConfig, SharedConfig};
use inkpress_core::processors::DispatcherConfig;
use inkpress_core::revisions::RevisionPolicy;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub revisions: RevisionPolicy,
    pub webhooks: DispatcherConfig,
}

impl LoadedConfig {
    /// Convert the reloadable sections into a SharedConfig.
    ///
    /// The server and webhook sections stay outside: they are consumed once
    /// at startup and never reloaded.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig::new(self.admin, self.revisions)
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        // Read the config file
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        // Apply CLI overrides
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        // Validate the configuration
        validate(&file_config)?;

        // Hash admin secret if needed and rewrite config
        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        // Build the config parts
        Ok(build_loaded_config(file_config, secret_hash))
    }

    /// Reload the configuration (used during SIGHUP).
    ///
    /// Returns a LoadedConfig that can be used to update individual parts
    /// of a SharedConfig.
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.admin.secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "admin secret must not be empty".to_string(),
        ));
    }
    if config.webhooks.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "webhooks.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.webhooks.workers == 0 {
        return Err(ConfigError::ValidationError(
            "webhooks.workers must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(file_config: FileConfig, secret_hash: String) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::new(secret_hash),
        revisions: RevisionPolicy {
            record_restore_to_current: file_config.revisions.record_restore_to_current,
        },
        webhooks: DispatcherConfig {
            max_attempts: file_config.webhooks.max_attempts,
            base_backoff: Duration::from_secs(file_config.webhooks.base_backoff_secs),
            workers: file_config.webhooks.workers,
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
