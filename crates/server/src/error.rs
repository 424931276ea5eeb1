// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use slideshelf_core::ScanError;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Presentation not found: {0}")]
    PresentationNotFound(String),

    #[error("Export job not found: {0}")]
    JobNotFound(String),

    /// A known resource that cannot be served, e.g. a job that is not finished.
    #[error("{0}")]
    NotReady(String),

    #[error("PDF file not found")]
    FileMissing,

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::PresentationNotFound(id) => {
                tracing::warn!(presentation_id = %id, "Presentation not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details(
                        "Presentation not found",
                        format!("Presentation ID: {id}"),
                    ),
                )
            }
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = %id, "Export job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Export job not found", format!("Job ID: {id}")),
                )
            }
            ApiError::NotReady(msg) => {
                tracing::info!(message = %msg, "Export not downloadable");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
            }
            ApiError::FileMissing => {
                tracing::error!("Export artifact missing for completed job");
                (StatusCode::NOT_FOUND, ErrorResponse::new("PDF file not found"))
            }
            ApiError::Scan(scan_err) => {
                let (status, error_msg) = match scan_err {
                    ScanError::DirNotFound { path } => {
                        tracing::error!(path = %path.display(), "Presentations directory not found");
                        (StatusCode::INTERNAL_SERVER_ERROR, "Presentations directory not found")
                    }
                    ScanError::PermissionDenied { path } => {
                        tracing::error!(path = %path.display(), "Permission denied");
                        (StatusCode::FORBIDDEN, "Permission denied")
                    }
                    ScanError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "IO error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "IO error reading presentations")
                    }
                    ScanError::Pattern(e) => {
                        tracing::error!(error = %e, "Invalid metadata pattern");
                        (StatusCode::INTERNAL_SERVER_ERROR, "Scanner misconfigured")
                    }
                };
                (status, ErrorResponse::with_details(error_msg, scan_err.to_string()))
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
