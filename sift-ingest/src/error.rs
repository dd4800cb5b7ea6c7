//! Error types for sift-ingest
//!
//! - [`ValidationError`]: user input rejected before any work starts
//! - [`SessionError`]: session-level failures (validation, conflicts)
//! - [`ApiError`]: HTTP mapping of the above

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sift_common::events::SubmissionState;
use thiserror::Error;

/// Input rejected before any state change or network call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select files first.")]
    EmptyBatch,

    #[error("Please enter at least one object.")]
    EmptyCriteria,

    #[error("Please enter both object and count.")]
    MissingField,

    #[error("Object label must not be empty.")]
    EmptyLabel,

    #[error("Count must be a valid number: {0:?}")]
    InvalidCount(String),

    #[error("Count must not be negative: {0}")]
    NegativeCount(i64),

    #[error("Object '{0}' is already in the search criteria.")]
    DuplicateLabel(String),

    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Session-level errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A submission is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid submission state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: SubmissionState,
        to: SubmissionState,
    },

    /// The background submission task panicked or was cancelled
    #[error("Submission task failed: {0}")]
    TaskFailed(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., submission already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// sift-common error
    #[error("Common error: {0}")]
    Common(#[from] sift_common::Error),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::IndexOutOfRange { .. } => ApiError::NotFound(err.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(e) => e.into(),
            SessionError::Conflict(msg) => ApiError::Conflict(msg),
            e @ SessionError::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
            e @ SessionError::TaskFailed(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
