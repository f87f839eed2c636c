//! Object maintenance handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use metrics::counter;
use tracing::info;

use crate::errors::UploadError;
use crate::handlers::{DeleteObjectsRequest, DeleteObjectsResponse};
use crate::metrics::DELETED_OBJECTS_TOTAL;
use crate::AppState;

/// `POST /v1/objects/delete` -- batch-delete objects from one bucket.
///
/// Partial failure is not an error: the response partitions the
/// requested keys into `deleted` and `failed`, and per-key failures
/// never fail the call as a whole.
pub async fn delete_objects(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteObjectsRequest>,
) -> Result<Json<DeleteObjectsResponse>, UploadError> {
    let outcome = state.service.delete_objects(&req.bucket, &req.keys).await?;

    counter!(DELETED_OBJECTS_TOTAL).increment(outcome.deleted.len() as u64);
    info!(
        "deleted {} of {} objects from {}",
        outcome.deleted.len(),
        req.keys.len(),
        req.bucket
    );

    Ok(Json(DeleteObjectsResponse {
        deleted: outcome.deleted,
        failed: outcome.failed,
    }))
}
