//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `AdminAuth` — verifies the `Inkpress-Admin-Authorization` header against
//!   the argon2-hashed admin secret (used by the Management API).

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use inkpress_sdk::signature::ADMIN_AUTH_HEADER;

use crate::state::AppState;

/// An Axum extractor that authenticates Management API requests.
///
/// # Header format
///
/// ```text
/// Inkpress-Admin-Authorization: {plaintext_admin_secret}
/// ```
///
/// The presented secret is verified against the argon2 hash held in the
/// shared admin config, so a SIGHUP secret rotation takes effect without a
/// restart.
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidHeader,
    Unauthorized,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "missing Inkpress-Admin-Authorization header",
            ),
            AdminAuthError::InvalidHeader => (
                StatusCode::BAD_REQUEST,
                "invalid Inkpress-Admin-Authorization header",
            ),
            AdminAuthError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "admin authentication failed")
            }
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        let admin = state.config.admin.read().await;
        if !admin.verify(presented) {
            drop(admin);
            return Err(AdminAuthError::Unauthorized);
        }
        drop(admin);

        Ok(AdminAuth)
    }
}
