//! Signature scheme for outbound webhook deliveries.
//!
//! Every webhook POST an Inkpress server makes carries an HMAC-SHA256
//! signature over the raw request body, so the receiver can verify that the
//! delivery really came from the server holding the subscription secret.
//! The wire format for the header is:
//!
//! ```text
//! Inkpress-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! where the signature is `HMAC-SHA256("{timestamp}.{raw_body}", secret)`.
//! The timestamp is included in the signed data so a captured delivery
//! cannot be replayed outside the freshness window.

/// Header name for the HMAC signature on webhook deliveries.
pub const SIGNATURE_HEADER: &str = "Inkpress-Signature";

/// Header name for management API authentication (plaintext admin secret).
pub const ADMIN_AUTH_HEADER: &str = "Inkpress-Admin-Authorization";

/// Maximum allowed age of a delivery signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Sign a webhook body with the subscription secret.
///
/// Computes `HMAC-SHA256("{now}.{body}", key)` and returns the full
/// `Inkpress-Signature` header value (`{timestamp}.{base64}`).
pub fn sign_body(body: &str, key: &[u8]) -> String {
    let timestamp = time::OffsetDateTime::now_utc().unix_timestamp();
    sign_body_at(body, key, timestamp)
}

/// Sign a webhook body with an explicit timestamp.
///
/// Exposed separately so verification tests and receivers replaying captured
/// deliveries can reproduce a signature exactly.
pub fn sign_body_at(body: &str, key: &[u8], timestamp: i64) -> String {
    let data = format!("{timestamp}.{body}");
    let signature = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
    );
    format_signature_header(timestamp, signature.as_ref())
}

/// Verify an `Inkpress-Signature` header against the raw request body.
///
/// Checks the HMAC and that the signature timestamp is within
/// [`MAX_SIGNATURE_AGE`]. This is the receiver-side counterpart of
/// [`sign_body`].
pub fn verify_body(header_value: &str, body: &str, key: &[u8]) -> Result<(), SignatureError> {
    let (timestamp, signature) = parse_signature_header(header_value)?;
    let data = format!("{timestamp}.{body}");
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
        signature.as_ref(),
    )?;
    check_timestamp(timestamp)?;
    Ok(())
}

/// Parse an `Inkpress-Signature` header value (`{timestamp}.{base64}`) into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let dot_pos = value.find('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = value[..dot_pos]
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(&value[dot_pos + 1..])
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a `{timestamp}.{base64}` header value from its parts.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

/// Check that a signature timestamp is within [`MAX_SIGNATURE_AGE`].
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now - timestamp > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Generate a random subscription secret (32 bytes, base64).
///
/// Used by the server when a subscription is registered without an explicit
/// secret.
pub fn generate_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    fast32::base64::RFC4648_NOPAD.encode(&bytes)
}
