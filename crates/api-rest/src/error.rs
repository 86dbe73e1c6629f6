//! Mapping from domain errors to HTTP responses.

use api_shared::dto::MessageRes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medibook_core::{BookingError, FilesError};

/// Error returned by every handler. The body is always `{"message": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidInput(m) => Self::new(StatusCode::BAD_REQUEST, m),
            BookingError::Unauthenticated(m) => Self::new(StatusCode::UNAUTHORIZED, m),
            BookingError::Unauthorized(m) => Self::new(StatusCode::FORBIDDEN, m),
            BookingError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, m),
            BookingError::Conflict(m) => Self::new(StatusCode::CONFLICT, m),
            // Integrity messages are written for clients; storage faults are not.
            BookingError::DataIntegrity(m) => {
                tracing::error!("data integrity fault: {}", m);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, m)
            }
            other => {
                tracing::error!("internal error: {:?}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
            }
        }
    }
}

impl From<FilesError> for ApiError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::NotFound(_) | FilesError::Uuid(_) => {
                Self::new(StatusCode::NOT_FOUND, "File not found")
            }
            FilesError::EmptyUpload(name) => {
                Self::bad_request(format!("Uploaded file is empty: {name}"))
            }
            other => ApiError::from(BookingError::Files(other)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageRes::new(self.message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
