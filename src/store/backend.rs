//! Abstract object store contract.
//!
//! Every storage backend must implement [`ObjectStore`].  The trait
//! covers exactly the S3 primitives the upload paths need: bucket
//! probing and creation, single-shot puts, the multipart upload
//! lifecycle, the head-object probe, and batch deletion.
//!
//! Futures returned by the trait are cancel-on-drop; dropping a caller
//! aborts the in-flight backend call.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// User metadata attached to an object, passed through to the backend
/// verbatim.  `None` means no metadata is sent at all.
pub type Metadata = HashMap<String, String>;

/// One uploaded part of a multipart upload, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSummary {
    /// Part number in `1..=10000`.
    pub part_number: i32,
    /// Backend-assigned checksum token for the part.
    pub etag: String,
}

/// Attributes of a stored object returned by the head-object probe.
#[derive(Debug, Clone)]
pub struct ObjectHead {
    /// Size of the object in bytes.
    pub content_length: i64,
    /// MIME type recorded for the object.
    pub content_type: String,
}

/// Result of a batch delete: requested keys partitioned into the ones
/// the backend deleted and the ones it reported errors for.  A key that
/// did not exist counts as deleted (S3 semantics).
#[derive(Debug, Clone, Default)]
pub struct DeleteOutcome {
    /// Keys the backend deleted (or that were already absent).
    pub deleted: Vec<String>,
    /// Keys the backend failed to delete.
    pub failed: Vec<String>,
}

/// Async object store contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Check whether `bucket` exists and is accessible.
    fn head_bucket(
        &self,
        bucket: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;

    /// Create `bucket`.
    fn create_bucket(
        &self,
        bucket: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Write a whole object in one call, returning its location URL.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
        metadata: Option<Metadata>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// Open a multipart upload, returning the backend-issued upload id.
    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        metadata: Option<Metadata>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// Upload one numbered part under `upload_id`, returning its ETag.
    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// List the parts uploaded so far for `upload_id`, in ascending
    /// part-number order, returning at most `max_parts` entries.
    fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        max_parts: i32,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<PartSummary>>> + Send + '_>>;

    /// Merge the given parts into the final object, returning its
    /// location URL.  `parts` must be in ascending part-number order.
    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<PartSummary>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// Discard all parts accumulated under `upload_id`.
    fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Fetch the attributes of a stored object.
    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectHead>> + Send + '_>>;

    /// Delete a set of keys in one call.
    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<DeleteOutcome>> + Send + '_>>;

    /// List bucket names.  Used as the backend liveness probe.
    fn list_buckets(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>>;
}
