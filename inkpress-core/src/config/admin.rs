//! Admin authentication configuration.

use argon2::password_hash::PasswordHash;
use argon2::{Argon2, PasswordVerifier};

/// Admin secret, stored only as an argon2 hash.
///
/// The server hashes a plaintext secret on first load and rewrites the
/// config file, so the plaintext never persists.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Verify a presented plaintext secret against the stored hash.
    ///
    /// A malformed stored hash verifies as false rather than erroring;
    /// the operator sees it as a rejected login, not a crash.
    pub fn verify(&self, presented: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(presented.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::PasswordHasher;

    fn hash(plaintext: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn verifies_correct_secret() {
        let config = AdminConfig::new(hash("hunter2"));
        assert!(config.verify("hunter2"));
        assert!(!config.verify("hunter3"));
    }

    #[test]
    fn malformed_hash_rejects_everything() {
        let config = AdminConfig::new("not-an-argon2-hash".into());
        assert!(!config.verify("anything"));
    }
}
