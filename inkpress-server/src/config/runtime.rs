//! Runtime configuration types.
//!
//! The reloadable sections (admin secret, revision policy) live in
//! `inkpress_core::config` so the core services can read them; this module
//! re-exports them next to the server-only startup settings.

pub use inkpress_core::config::{AdminConfig, SharedConfig};

use std::net::SocketAddr;

/// Server settings consumed once at startup.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// The address and port the HTTP server binds to.
    pub listen: SocketAddr,
}
