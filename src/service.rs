//! Upload orchestration service.
//!
//! [`UploadService`] is the storage-facing core of the gateway: it
//! validates every request locally before any backend round trip,
//! provisions the target bucket through the [`BucketProvisioner`], and
//! drives the single-shot and multipart upload paths against the
//! [`ObjectStore`].
//!
//! No session state is held here between requests; the backend is the
//! source of truth for which multipart uploads and parts exist.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bucket::BucketProvisioner;
use crate::errors::UploadError;
use crate::store::backend::{DeleteOutcome, Metadata, ObjectHead, ObjectStore, PartSummary};

/// Chunk size for the single-shot path: bodies larger than this are
/// split into 32 MiB parts under the hood, invisible to the caller.
const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Maximum number of parts one multipart upload can hold.
pub const MAX_PARTS: i64 = 10_000;

/// Identifiers of a freshly opened multipart upload.
#[derive(Debug, Clone)]
pub struct InitiatedUpload {
    /// Opaque backend-issued upload token.
    pub upload_id: String,
    /// Object key the upload is bound to.
    pub key: String,
    /// Normalized bucket name the upload is bound to.
    pub bucket: String,
}

/// Attributes of the assembled object, reported after completion.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub content_length: i64,
    pub content_type: String,
}

/// Storage-facing upload operations.
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    provisioner: BucketProvisioner,
    chunk_size: usize,
}

impl UploadService {
    /// Create a service over the given store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            provisioner: BucketProvisioner::new(store.clone()),
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the single-shot chunk size.  Used by tests to exercise
    /// the chunked path without multi-megabyte bodies.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Upload a whole file to `bucket`/`key`, returning its location.
    ///
    /// Metadata is attached verbatim when a non-empty map is supplied;
    /// `None` and an empty map both mean no metadata is sent.  Bodies
    /// above the internal chunk size are streamed through the backend's
    /// multipart primitives without exposing that to the caller.
    pub async fn upload_file(
        &self,
        body: Option<Bytes>,
        key: &str,
        bucket: &str,
        content_type: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<String, UploadError> {
        let body = body.ok_or(UploadError::MissingField { field: "file" })?;
        if key.is_empty() {
            return Err(UploadError::MissingField { field: "key" });
        }
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        let metadata = metadata.filter(|m| !m.is_empty());

        if body.len() <= self.chunk_size {
            return self
                .store
                .put_object(&bucket, key, body, content_type, metadata)
                .await
                .map_err(|e| UploadError::backend("upload file", &bucket, key, e));
        }

        self.upload_chunked(&bucket, key, body, content_type, metadata)
            .await
    }

    /// Drive a large single-shot body through the multipart primitives
    /// in fixed-size chunks, aborting the backend upload on any failure.
    async fn upload_chunked(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<String, UploadError> {
        let upload_id = self
            .store
            .create_multipart_upload(bucket, key, content_type, metadata)
            .await
            .map_err(|e| UploadError::backend("init chunked upload", bucket, key, e))?;

        debug!(
            "chunked upload {} to {}/{}: {} bytes in {} byte chunks",
            upload_id,
            bucket,
            key,
            body.len(),
            self.chunk_size
        );

        match self
            .upload_chunks(bucket, key, &upload_id, body)
            .await
        {
            Ok(parts) => self
                .store
                .complete_multipart_upload(bucket, key, &upload_id, parts)
                .await
                .map_err(|e| {
                    UploadError::backend_upload("complete chunked upload", bucket, key, &upload_id, e)
                }),
            Err(err) => {
                // Free the backend-side parts; the original error is
                // what the caller needs to see.
                if let Err(abort_err) = self
                    .store
                    .abort_multipart_upload(bucket, key, &upload_id)
                    .await
                {
                    warn!(
                        "failed to abort chunked upload {} after error: {}",
                        upload_id, abort_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn upload_chunks(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        body: Bytes,
    ) -> Result<Vec<PartSummary>, UploadError> {
        let mut parts = Vec::new();
        let mut offset = 0usize;
        let mut part_number: i32 = 1;

        while offset < body.len() {
            let end = (offset + self.chunk_size).min(body.len());
            let chunk = body.slice(offset..end);
            let etag = self
                .store
                .upload_part(bucket, key, upload_id, part_number, chunk)
                .await
                .map_err(|e| {
                    UploadError::backend_upload("upload chunk", bucket, key, upload_id, e)
                })?;
            parts.push(PartSummary { part_number, etag });
            offset = end;
            part_number += 1;
        }

        Ok(parts)
    }

    /// Open a multipart upload session for `bucket`/`key`.
    ///
    /// Empty or absent metadata is accepted and treated as "no
    /// metadata"; it is never an error at this layer.
    pub async fn upload_init(
        &self,
        key: &str,
        bucket: &str,
        content_type: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<InitiatedUpload, UploadError> {
        if key.is_empty() {
            return Err(UploadError::MissingField { field: "key" });
        }
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        let metadata = metadata.filter(|m| !m.is_empty());

        let upload_id = self
            .store
            .create_multipart_upload(&bucket, key, content_type, metadata)
            .await
            .map_err(|e| UploadError::backend("init upload", &bucket, key, e))?;

        Ok(InitiatedUpload {
            upload_id,
            key: key.to_string(),
            bucket,
        })
    }

    /// Upload one numbered part under an open upload, returning its ETag.
    ///
    /// The bucket is re-provisioned defensively so a part call is
    /// self-sufficient even if the bucket disappeared after init.
    /// Whether `key`/`bucket` match the ones recorded at init is NOT
    /// checked here; the backend enforces that association and a
    /// mismatch surfaces as a backend error.
    pub async fn upload_part(
        &self,
        upload_id: &str,
        key: &str,
        bucket: &str,
        part_number: i64,
        body: Option<Bytes>,
    ) -> Result<String, UploadError> {
        let body = body.ok_or(UploadError::MissingField { field: "part body" })?;
        if key.is_empty() {
            return Err(UploadError::MissingField { field: "key" });
        }
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }
        if upload_id.is_empty() {
            return Err(UploadError::MissingField { field: "upload id" });
        }
        if !(1..=MAX_PARTS).contains(&part_number) {
            return Err(UploadError::PartNumberOutOfRange { part_number });
        }

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        self.store
            .upload_part(&bucket, key, upload_id, part_number as i32, body)
            .await
            .map_err(|e| UploadError::backend_upload("upload part", &bucket, key, upload_id, e))
    }

    /// List the parts uploaded so far, ascending by part number.
    ///
    /// Internal helper for [`upload_complete`]; completion assembly
    /// depends on the ascending order.
    pub async fn list_upload_parts(
        &self,
        upload_id: &str,
        key: &str,
        bucket: &str,
    ) -> Result<Vec<PartSummary>, UploadError> {
        if key.is_empty() {
            return Err(UploadError::MissingField { field: "key" });
        }
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }
        if upload_id.is_empty() {
            return Err(UploadError::MissingField { field: "upload id" });
        }

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        self.store
            .list_parts(&bucket, key, upload_id, MAX_PARTS as i32)
            .await
            .map_err(|e| UploadError::backend_upload("list parts", &bucket, key, upload_id, e))
    }

    /// Complete a multipart upload: assemble all previously accepted
    /// parts in ascending part-number order, then probe the assembled
    /// object to report its final size and content type.
    ///
    /// If the probe fails after a successful merge the call still
    /// returns an error even though the object is durably stored --
    /// the caller could not be told its attributes.
    pub async fn upload_complete(
        &self,
        upload_id: &str,
        key: &str,
        bucket: &str,
    ) -> Result<CompletedUpload, UploadError> {
        if key.is_empty() {
            return Err(UploadError::MissingField { field: "key" });
        }
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }
        if upload_id.is_empty() {
            return Err(UploadError::MissingField { field: "upload id" });
        }

        let parts = self.list_upload_parts(upload_id, key, bucket).await?;

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        self.store
            .complete_multipart_upload(&bucket, key, upload_id, parts)
            .await
            .map_err(|e| {
                UploadError::backend_upload("complete upload", &bucket, key, upload_id, e)
            })?;

        let head = self.head_object(key, &bucket).await?;

        Ok(CompletedUpload {
            content_length: head.content_length,
            content_type: head.content_type,
        })
    }

    /// Fetch a stored object's attributes.
    pub async fn head_object(&self, key: &str, bucket: &str) -> Result<ObjectHead, UploadError> {
        if key.is_empty() {
            return Err(UploadError::MissingField { field: "key" });
        }
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        self.store
            .head_object(&bucket, key)
            .await
            .map_err(|e| UploadError::backend("head object", &bucket, key, e))
    }

    /// Abort a multipart upload, freeing backend-side parts.
    ///
    /// Aborting an upload that was already completed or aborted is a
    /// backend-reported error, passed through unchanged.
    pub async fn upload_abort(
        &self,
        upload_id: &str,
        key: &str,
        bucket: &str,
    ) -> Result<bool, UploadError> {
        if key.is_empty() {
            return Err(UploadError::MissingField { field: "key" });
        }
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }
        if upload_id.is_empty() {
            return Err(UploadError::MissingField { field: "upload id" });
        }

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        self.store
            .abort_multipart_upload(&bucket, key, upload_id)
            .await
            .map_err(|e| UploadError::backend_upload("abort upload", &bucket, key, upload_id, e))?;

        Ok(true)
    }

    /// Delete a set of keys in one backend call, partitioning the
    /// result into deleted and failed keys.  A key that does not exist
    /// is reported as deleted (S3 semantics).
    pub async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteOutcome, UploadError> {
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }
        if keys.is_empty() {
            return Err(UploadError::MissingField { field: "keys" });
        }

        let mut bucket = bucket.to_string();
        self.provisioner.ensure_exists(&mut bucket).await?;

        self.store
            .delete_objects(&bucket, keys)
            .await
            .map_err(|e| UploadError::backend("delete objects", &bucket, "", e))
    }

    /// Probe backend liveness.  Used by the health check worker.
    pub async fn backend_alive(&self) -> bool {
        self.store.list_buckets().await.is_ok()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;

    /// Store double that fails the test if any backend call is made.
    /// Used to prove validation happens before any backend round trip.
    struct PanicStore;

    impl ObjectStore for PanicStore {
        fn head_bucket(
            &self,
            _bucket: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn create_bucket(
            &self,
            _bucket: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn put_object(
            &self,
            _bucket: &str,
            _key: &str,
            _body: Bytes,
            _content_type: Option<String>,
            _metadata: Option<Metadata>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn create_multipart_upload(
            &self,
            _bucket: &str,
            _key: &str,
            _content_type: Option<String>,
            _metadata: Option<Metadata>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn upload_part(
            &self,
            _bucket: &str,
            _key: &str,
            _upload_id: &str,
            _part_number: i32,
            _body: Bytes,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn list_parts(
            &self,
            _bucket: &str,
            _key: &str,
            _upload_id: &str,
            _max_parts: i32,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<PartSummary>>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn complete_multipart_upload(
            &self,
            _bucket: &str,
            _key: &str,
            _upload_id: &str,
            _parts: Vec<PartSummary>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn abort_multipart_upload(
            &self,
            _bucket: &str,
            _key: &str,
            _upload_id: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn head_object(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectHead>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn delete_objects(
            &self,
            _bucket: &str,
            _keys: &[String],
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<DeleteOutcome>> + Send + '_>> {
            panic!("backend must not be called")
        }
        fn list_buckets(
            &self,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
            panic!("backend must not be called")
        }
    }

    fn panic_service() -> UploadService {
        UploadService::new(Arc::new(PanicStore))
    }

    fn memory_service() -> (UploadService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (UploadService::new(store.clone()), store)
    }

    fn body(data: &'static [u8]) -> Option<Bytes> {
        Some(Bytes::from_static(data))
    }

    // -- Validation happens before any backend call --------------------

    #[tokio::test]
    async fn test_upload_file_validates_before_backend() {
        let service = panic_service();

        let err = service
            .upload_file(None, "k", "b", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "file is required");

        let err = service
            .upload_file(body(b"x"), "", "b", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "key is required");

        let err = service
            .upload_file(body(b"x"), "k", "", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bucket name is required");
    }

    #[tokio::test]
    async fn test_upload_init_validates_before_backend() {
        let service = panic_service();

        assert!(service.upload_init("", "b", None, None).await.is_err());
        assert!(service.upload_init("k", "", None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_upload_part_validates_in_order_before_backend() {
        let service = panic_service();

        // First failing check determines the error.
        let err = service
            .upload_part("", "", "", 0, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "part body is required");

        let err = service
            .upload_part("", "", "", 0, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "key is required");

        let err = service
            .upload_part("", "k", "", 0, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bucket name is required");

        let err = service
            .upload_part("", "k", "b", 0, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "upload id is required");

        let err = service
            .upload_part("id", "k", "b", 0, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "part number must be between 1 and 10,000");

        let err = service
            .upload_part("id", "k", "b", 10001, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");
    }

    #[tokio::test]
    async fn test_complete_abort_delete_validate_before_backend() {
        let service = panic_service();

        assert!(service.upload_complete("", "k", "b").await.is_err());
        assert!(service.upload_complete("id", "", "b").await.is_err());
        assert!(service.upload_complete("id", "k", "").await.is_err());
        assert!(service.upload_abort("", "k", "b").await.is_err());
        assert!(service.delete_objects("", &["k".to_string()]).await.is_err());
        assert!(service.delete_objects("b", &[]).await.is_err());
    }

    // -- Single-shot path ----------------------------------------------

    #[tokio::test]
    async fn test_upload_file_small_body() {
        let (service, store) = memory_service();

        let location = service
            .upload_file(
                body(b"hello world"),
                "f.txt",
                "My Bucket",
                Some("text/plain".to_string()),
                None,
            )
            .await
            .unwrap();

        assert_eq!(location, "memory://my-bucket/f.txt");
        assert_eq!(
            store.object_data("my-bucket", "f.txt").await.unwrap(),
            Bytes::from_static(b"hello world")
        );
    }

    #[tokio::test]
    async fn test_upload_file_chunks_large_body() {
        let store = Arc::new(MemoryStore::new());
        let service = UploadService::new(store.clone()).with_chunk_size(4);

        let data = Bytes::from_static(b"0123456789");
        service
            .upload_file(Some(data.clone()), "big.bin", "b", None, None)
            .await
            .unwrap();

        // 10 bytes in 4-byte chunks: reassembled object must equal the
        // original body.
        assert_eq!(store.object_data("b", "big.bin").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_upload_file_empty_metadata_is_no_metadata() {
        let (service, _store) = memory_service();

        // None and an empty map behave identically.
        service
            .upload_file(body(b"a"), "k1", "b", None, None)
            .await
            .unwrap();
        service
            .upload_file(body(b"a"), "k2", "b", None, Some(HashMap::new()))
            .await
            .unwrap();
    }

    // -- Multipart session ----------------------------------------------

    #[tokio::test]
    async fn test_part_number_boundaries() {
        let (service, _store) = memory_service();
        let init = service.upload_init("k", "b", None, None).await.unwrap();

        assert!(service
            .upload_part(&init.upload_id, "k", "b", 1, body(b"x"))
            .await
            .is_ok());
        assert!(service
            .upload_part(&init.upload_id, "k", "b", 10000, body(b"x"))
            .await
            .is_ok());

        let err = service
            .upload_part(&init.upload_id, "k", "b", 0, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");
        let err = service
            .upload_part(&init.upload_id, "k", "b", 10001, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");
    }

    #[tokio::test]
    async fn test_out_of_order_parts_complete_in_numeric_order() {
        let (service, store) = memory_service();
        let init = service.upload_init("f.txt", "b", None, None).await.unwrap();

        // Submit 2, then 1, then 3.
        service
            .upload_part(&init.upload_id, "f.txt", "b", 2, body(b"bb"))
            .await
            .unwrap();
        service
            .upload_part(&init.upload_id, "f.txt", "b", 1, body(b"aa"))
            .await
            .unwrap();
        service
            .upload_part(&init.upload_id, "f.txt", "b", 3, body(b"cc"))
            .await
            .unwrap();

        let parts = service
            .list_upload_parts(&init.upload_id, "f.txt", "b")
            .await
            .unwrap();
        assert_eq!(
            parts.iter().map(|p| p.part_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        service
            .upload_complete(&init.upload_id, "f.txt", "b")
            .await
            .unwrap();

        assert_eq!(
            store.object_data("b", "f.txt").await.unwrap(),
            Bytes::from_static(b"aabbcc")
        );
    }

    #[tokio::test]
    async fn test_mismatched_bucket_or_key_is_a_backend_error() {
        let (service, _store) = memory_service();
        let init = service.upload_init("k", "b", None, None).await.unwrap();

        // Valid uploadId but wrong key/bucket: rejected by the backend,
        // not by local validation.
        let err = service
            .upload_part(&init.upload_id, "other", "b", 1, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BackendError");

        let err = service
            .upload_part(&init.upload_id, "k", "elsewhere", 1, body(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BackendError");
    }

    #[tokio::test]
    async fn test_init_accepts_empty_and_absent_metadata() {
        let (service, _store) = memory_service();

        assert!(service.upload_init("k1", "b", None, None).await.is_ok());
        assert!(service
            .upload_init("k2", "b", None, Some(HashMap::new()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_abort_frees_the_session() {
        let (service, store) = memory_service();
        let init = service.upload_init("k", "b", None, None).await.unwrap();
        service
            .upload_part(&init.upload_id, "k", "b", 1, body(b"x"))
            .await
            .unwrap();

        let status = service
            .upload_abort(&init.upload_id, "k", "b")
            .await
            .unwrap();
        assert!(status);
        assert!(!store.upload_is_open(&init.upload_id).await);

        // Further operations on the dead session are backend errors.
        let err = service
            .upload_part(&init.upload_id, "k", "b", 2, body(b"y"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BackendError");
        let err = service
            .upload_abort(&init.upload_id, "k", "b")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BackendError");
    }

    #[tokio::test]
    async fn test_end_to_end_init_part_complete() {
        let (service, _store) = memory_service();

        let init = service
            .upload_init("f.txt", "b", Some("text/plain".to_string()), Some(HashMap::new()))
            .await
            .unwrap();
        assert!(!init.upload_id.is_empty());
        assert_eq!(init.key, "f.txt");
        assert_eq!(init.bucket, "b");

        let etag = service
            .upload_part(&init.upload_id, "f.txt", "b", 1, body(b"hello"))
            .await
            .unwrap();
        assert!(!etag.is_empty());

        let completed = service
            .upload_complete(&init.upload_id, "f.txt", "b")
            .await
            .unwrap();
        assert_eq!(completed.content_length, 5);
        assert_eq!(completed.content_type, "text/plain");
    }

    // -- Batch delete ----------------------------------------------------

    #[tokio::test]
    async fn test_partial_batch_delete_reports_absent_keys_as_deleted() {
        let (service, _store) = memory_service();
        service
            .upload_file(body(b"x"), "real", "b", None, None)
            .await
            .unwrap();

        let outcome = service
            .delete_objects("b", &["real".to_string(), "ghost".to_string()])
            .await
            .unwrap();

        assert_eq!(
            outcome.deleted,
            vec!["real".to_string(), "ghost".to_string()]
        );
        assert!(outcome.failed.is_empty());
    }
}
