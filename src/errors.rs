//! Upload gateway error types.
//!
//! Validation failures are detected locally, before any backend round
//! trip, and map to `InvalidArgument`.  Everything the object store
//! returns is wrapped with the operation and target so a failure can be
//! diagnosed without a trace correlation system.  The enum implements
//! [`axum::response::IntoResponse`] so handlers can simply return
//! `Err(UploadError::MissingField { .. })`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Errors produced by the upload service and its handlers.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A required request field is missing or empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// Part number outside the allowed `[1, 10000]` range.
    #[error("part number must be between 1 and 10,000")]
    PartNumberOutOfRange { part_number: i64 },

    /// The object store reported a failure.  Never retried here; retry
    /// policy belongs to the backend client's transport layer.
    #[error("failed to {op} at {bucket}/{key}{}: {source}", .upload_id.as_deref().map(|id| format!(" (upload {id})")).unwrap_or_default())]
    Backend {
        op: &'static str,
        bucket: String,
        key: String,
        upload_id: Option<String>,
        source: anyhow::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl UploadError {
    /// Shorthand for a backend failure without an upload id.
    pub fn backend(op: &'static str, bucket: &str, key: &str, source: anyhow::Error) -> Self {
        UploadError::Backend {
            op,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: None,
            source,
        }
    }

    /// Shorthand for a backend failure scoped to a multipart upload.
    pub fn backend_upload(
        op: &'static str,
        bucket: &str,
        key: &str,
        upload_id: &str,
        source: anyhow::Error,
    ) -> Self {
        UploadError::Backend {
            op,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: Some(upload_id.to_string()),
            source,
        }
    }

    /// Return the error code string sent to callers.
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::MissingField { .. } => "InvalidArgument",
            UploadError::PartNumberOutOfRange { .. } => "InvalidArgument",
            UploadError::Backend { .. } => "BackendError",
            UploadError::Internal(_) => "InternalError",
        }
    }

    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::MissingField { .. } => StatusCode::BAD_REQUEST,
            UploadError::PartNumberOutOfRange { .. } => StatusCode::BAD_REQUEST,
            UploadError::Backend { .. } => StatusCode::BAD_GATEWAY,
            UploadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let request_id = generate_request_id();
        let status = self.status_code();

        let body = json!({
            "code": self.code(),
            "message": self.to_string(),
            "request_id": request_id,
        });

        (status, [("x-request-id", request_id)], Json(body)).into_response()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_is_invalid_argument() {
        let err = UploadError::MissingField { field: "key" };
        assert_eq!(err.code(), "InvalidArgument");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "key is required");
    }

    #[test]
    fn test_part_number_bounds_message() {
        let err = UploadError::PartNumberOutOfRange { part_number: 10001 };
        assert_eq!(err.code(), "InvalidArgument");
        assert_eq!(err.to_string(), "part number must be between 1 and 10,000");
    }

    #[test]
    fn test_backend_error_names_operation_and_target() {
        let err = UploadError::backend_upload(
            "upload part",
            "b",
            "k",
            "abc-123",
            anyhow::anyhow!("connection refused"),
        );
        assert_eq!(err.code(), "BackendError");
        let msg = err.to_string();
        assert!(msg.contains("upload part"));
        assert!(msg.contains("b/k"));
        assert!(msg.contains("abc-123"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_request_id_shape() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
