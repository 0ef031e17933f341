/// Unified error types for the vidshare backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum VidError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed input, rejected before any side effect
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload request carried no file part
    #[error("No file provided")]
    NoFileProvided,

    /// Upload could not be completed after validation passed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Payload exceeded the configured upload limit
    #[error("Payload exceeds maximum size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VidError {
    /// Whether the error originated in the blob store
    pub fn is_storage_error(&self) -> bool {
        matches!(self, VidError::BlobStorage(_) | VidError::PayloadTooLarge { .. })
    }

    /// Collapse post-validation failures into `UploadFailed`
    ///
    /// Request-shape errors keep their own variant so the caller can fix the request.
    pub fn into_upload_failure(self) -> Self {
        match self {
            VidError::NoFileProvided
            | VidError::Validation(_)
            | VidError::NotFound(_)
            | VidError::PayloadTooLarge { .. }
            | VidError::UploadFailed(_) => self,
            VidError::Database(e) => {
                tracing::error!("Upload metadata write failed: {}", e);
                VidError::UploadFailed("metadata store rejected the video".to_string())
            }
            e if e.is_storage_error() => {
                tracing::error!("Upload blob write failed: {}", e);
                VidError::UploadFailed(e.to_string())
            }
            other => VidError::UploadFailed(other.to_string()),
        }
    }
}

/// Classify a sqlx error, turning unique-constraint violations into `Conflict`
pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> VidError {
    let is_unique = err
        .as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false);

    if is_unique {
        VidError::Conflict(message.into())
    } else {
        VidError::Database(err)
    }
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert VidError to HTTP response
impl IntoResponse for VidError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            VidError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "ValidationError",
                self.to_string(),
            ),
            VidError::NoFileProvided => (
                StatusCode::BAD_REQUEST,
                "NoFileProvided",
                self.to_string(),
            ),
            VidError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "UploadFailed",
                self.to_string(),
            ),
            VidError::UploadFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UploadFailed",
                self.to_string(),
            ),
            VidError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationFailed",
                self.to_string(),
            ),
            VidError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            VidError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Conflict",
                self.to_string(),
            ),
            VidError::BlobStorage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "StorageError",
                self.to_string(),
            ),
            VidError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
            VidError::Internal(_) | VidError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type VidResult<T> = Result<T, VidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classification() {
        assert!(VidError::BlobStorage("disk full".into()).is_storage_error());
        assert!(VidError::PayloadTooLarge { limit: 10 }.is_storage_error());
        assert!(!VidError::NoFileProvided.is_storage_error());
    }

    #[test]
    fn test_upload_failure_keeps_request_errors() {
        assert!(matches!(
            VidError::NoFileProvided.into_upload_failure(),
            VidError::NoFileProvided
        ));
        assert!(matches!(
            VidError::BlobStorage("boom".into()).into_upload_failure(),
            VidError::UploadFailed(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            VidError::NoFileProvided.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VidError::Conflict("dup".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            VidError::PayloadTooLarge { limit: 1 }.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
