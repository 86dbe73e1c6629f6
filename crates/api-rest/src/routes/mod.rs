//! Route handlers, grouped by resource.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod system;

use crate::error::ApiError;
use axum::http::StatusCode;
use medibook_core::RecordId;

/// Parses a path id. Ids that cannot exist are reported as `not_found`.
pub(crate) fn path_id(raw: &str, not_found: &'static str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|_| ApiError::new(StatusCode::NOT_FOUND, not_found))
}
