//! Content fingerprinting for no-op mutation detection.
//!
//! A fingerprint is a SHA-256 digest over a canonical, key-sorted JSON
//! serialization of the six hashed snapshot fields. Two snapshots with the
//! same logical content always hash identically regardless of how the
//! snapshot was assembled, so comparing fingerprints is sufficient to decide
//! whether an automatic capture would duplicate the latest revision.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The hashed fields of a revisionable entity at one instant.
///
/// Missing fields are serialized as JSON `null`, never omitted, so absence
/// and presence-with-null are indistinguishable by design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<Value>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub featured_image: Option<String>,
}

impl ContentSnapshot {
    /// Compute the content fingerprint: lowercase hex SHA-256 over the
    /// canonical serialization.
    ///
    /// Total for any snapshot; serialization of the canonical map cannot
    /// fail because every field is already a JSON value.
    pub fn fingerprint(&self) -> String {
        let digest = ring::digest::digest(&ring::digest::SHA256, &self.canonical_bytes());
        hex_lower(digest.as_ref())
    }

    /// Canonical serialization: key-sorted map of the six hashed fields.
    ///
    /// `BTreeMap` fixes the top-level key order; nested objects inside
    /// `content` are also key-sorted because `serde_json::Map` preserves
    /// sorted order without the `preserve_order` feature.
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
        fields.insert("title", json_or_null(&self.title));
        fields.insert("excerpt", json_or_null(&self.excerpt));
        fields.insert("content", self.content.clone().unwrap_or(Value::Null));
        fields.insert("meta_title", json_or_null(&self.meta_title));
        fields.insert("meta_description", json_or_null(&self.meta_description));
        fields.insert("featured_image", json_or_null(&self.featured_image));
        serde_json::to_vec(&fields).unwrap_or_default()
    }
}

fn json_or_null(field: &Option<String>) -> Value {
    match field {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
    }
    out
}
