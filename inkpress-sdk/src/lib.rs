//! Shared wire types for Inkpress, a headless content management backend.
//!
//! This crate defines everything an API consumer or webhook receiver needs
//! to talk to an Inkpress server without depending on server internals:
//!
//! - the closed domain event taxonomy ([`objects::EventType`])
//! - the webhook delivery envelope ([`objects::WebhookEnvelope`])
//! - the `Inkpress-Signature` HMAC scheme ([`signature`])
//! - management API request/response objects ([`objects`])

pub mod objects;
pub mod signature;
