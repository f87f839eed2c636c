//! Upload RPC handlers: single-shot uploads and multipart session
//! lifecycle (init / complete / abort).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use metrics::counter;
use tracing::info;

use crate::errors::UploadError;
use crate::handlers::{
    UploadAbortRequest, UploadAbortResponse, UploadCompleteRequest, UploadCompleteResponse,
    UploadInitRequest, UploadInitResponse, UploadLocationResponse, UploadMediaRequest,
    UploadMultipartRequest,
};
use crate::metrics::{UPLOADS_TOTAL, UPLOAD_SESSIONS_TOTAL};
use crate::AppState;

/// `POST /v1/upload/media` -- upload a whole file without metadata.
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadMediaRequest>,
) -> Result<Json<UploadLocationResponse>, UploadError> {
    let location = state
        .service
        .upload_file(req.file, &req.key, &req.bucket, req.content_type, None)
        .await?;

    counter!(UPLOADS_TOTAL, "kind" => "media").increment(1);
    info!("uploaded {} to {}", req.key, location);

    Ok(Json(UploadLocationResponse { location }))
}

/// `POST /v1/upload/multipart` -- upload a whole file with metadata.
///
/// Unlike the media endpoint, metadata here is mandatory and must be
/// non-empty.
pub async fn upload_multipart(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadMultipartRequest>,
) -> Result<Json<UploadLocationResponse>, UploadError> {
    if req.metadata.is_empty() {
        return Err(UploadError::MissingField { field: "metadata" });
    }

    let location = state
        .service
        .upload_file(
            req.file,
            &req.key,
            &req.bucket,
            req.content_type,
            Some(req.metadata),
        )
        .await?;

    counter!(UPLOADS_TOTAL, "kind" => "multipart").increment(1);
    info!("uploaded {} to {}", req.key, location);

    Ok(Json(UploadLocationResponse { location }))
}

/// `POST /v1/upload/init` -- open a multipart upload session.
pub async fn upload_init(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadInitRequest>,
) -> Result<Json<UploadInitResponse>, UploadError> {
    let initiated = state
        .service
        .upload_init(&req.key, &req.bucket, req.content_type, req.metadata)
        .await?;

    counter!(UPLOAD_SESSIONS_TOTAL, "event" => "init").increment(1);
    info!(
        "opened upload {} for {}/{}",
        initiated.upload_id, initiated.bucket, initiated.key
    );

    Ok(Json(UploadInitResponse {
        upload_id: initiated.upload_id,
        key: initiated.key,
        bucket: initiated.bucket,
    }))
}

/// `POST /v1/upload/complete` -- assemble all parts into the final
/// object and report its attributes.
pub async fn upload_complete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadCompleteRequest>,
) -> Result<Json<UploadCompleteResponse>, UploadError> {
    let completed = state
        .service
        .upload_complete(&req.upload_id, &req.key, &req.bucket)
        .await?;

    counter!(UPLOAD_SESSIONS_TOTAL, "event" => "complete").increment(1);
    info!(
        "completed upload {}: {} bytes of {}",
        req.upload_id, completed.content_length, completed.content_type
    );

    Ok(Json(UploadCompleteResponse {
        content_length: completed.content_length,
        content_type: completed.content_type,
    }))
}

/// `POST /v1/upload/abort` -- abort a multipart upload session.
pub async fn upload_abort(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadAbortRequest>,
) -> Result<Json<UploadAbortResponse>, UploadError> {
    let status = state
        .service
        .upload_abort(&req.upload_id, &req.key, &req.bucket)
        .await?;

    counter!(UPLOAD_SESSIONS_TOTAL, "event" => "abort").increment(1);
    info!("aborted upload {}", req.upload_id);

    Ok(Json(UploadAbortResponse { status }))
}
