//! HTTP API modules.

pub mod extractors;
pub mod manage;
