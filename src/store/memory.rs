//! In-memory object store backend.
//!
//! Buckets, objects, and in-flight multipart uploads are held in
//! `tokio::sync::RwLock<HashMap<...>>` maps.  Useful for local
//! development (`store.backend: memory`) and as the backend double for
//! the test suite.
//!
//! Semantics mirror an S3-compatible backend: part ETags are quoted
//! MD5-hex digests, completed objects get a composite `"{md5}-{n}"`
//! ETag, deleting an absent key succeeds, and every multipart call
//! validates that the `(upload_id, bucket, key)` triple matches what
//! was recorded at creation time.
//!
//! Unlike S3, `create_bucket` on an existing bucket is an error here.
//! The bucket provisioner only creates after a negative existence
//! probe, so under correct serialization the duplicate-create path is
//! never hit in-process.

use bytes::Bytes;
use md5::{Digest, Md5};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::RwLock;

use super::backend::{DeleteOutcome, Metadata, ObjectHead, ObjectStore, PartSummary};

/// A stored object.
#[derive(Debug, Clone)]
struct ObjectEntry {
    data: Bytes,
    etag: String,
    content_type: String,
}

/// An in-flight multipart upload.
#[derive(Debug, Clone)]
struct UploadEntry {
    bucket: String,
    key: String,
    content_type: Option<String>,
    /// part number -> (data, etag); BTreeMap keeps ascending order.
    parts: BTreeMap<i32, (Bytes, String)>,
}

/// In-memory object store.
#[derive(Default)]
pub struct MemoryStore {
    buckets: RwLock<HashSet<String>>,
    /// "bucket/key" -> object.
    objects: RwLock<HashMap<String, ObjectEntry>>,
    /// upload_id -> upload state.
    uploads: RwLock<HashMap<String, UploadEntry>>,
}

impl MemoryStore {
    /// Create an empty `MemoryStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the quoted MD5-hex ETag for a byte slice.
    fn compute_etag(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        format!("\"{}\"", hex::encode(hasher.finalize()))
    }

    /// Compute the composite multipart ETag: md5 of the concatenated
    /// binary part digests, suffixed with the part count.
    fn composite_etag(part_etags: &[String]) -> String {
        let mut combined: Vec<u8> = Vec::new();
        for etag in part_etags {
            if let Ok(bytes) = hex::decode(etag.trim_matches('"')) {
                combined.extend_from_slice(&bytes);
            }
        }
        let mut hasher = Md5::new();
        hasher.update(&combined);
        format!("\"{}-{}\"", hex::encode(hasher.finalize()), part_etags.len())
    }

    fn object_key(bucket: &str, key: &str) -> String {
        format!("{bucket}/{key}")
    }

    fn location(bucket: &str, key: &str) -> String {
        format!("memory://{bucket}/{key}")
    }

    /// Generate an opaque upload id.
    fn new_upload_id() -> String {
        let bytes: [u8; 16] = rand::random();
        hex::encode(bytes)
    }

    /// Fetch a stored object's raw bytes.  Test-suite accessor.
    pub async fn object_data(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .await
            .get(&Self::object_key(bucket, key))
            .map(|o| o.data.clone())
    }

    /// Whether a multipart upload is still open.  Test-suite accessor.
    pub async fn upload_is_open(&self, upload_id: &str) -> bool {
        self.uploads.read().await.contains_key(upload_id)
    }
}

impl ObjectStore for MemoryStore {
    fn head_bucket(
        &self,
        bucket: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let bucket = bucket.to_string();
        Box::pin(async move { Ok(self.buckets.read().await.contains(&bucket)) })
    }

    fn create_bucket(
        &self,
        bucket: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let bucket = bucket.to_string();
        Box::pin(async move {
            let mut buckets = self.buckets.write().await;
            if !buckets.insert(bucket.clone()) {
                anyhow::bail!("bucket {bucket} already exists");
            }
            Ok(())
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
        _metadata: Option<Metadata>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            if !self.buckets.read().await.contains(&bucket) {
                anyhow::bail!("no such bucket: {bucket}");
            }
            let etag = Self::compute_etag(&body);
            self.objects.write().await.insert(
                Self::object_key(&bucket, &key),
                ObjectEntry {
                    data: body,
                    etag,
                    content_type: content_type
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                },
            );
            Ok(Self::location(&bucket, &key))
        })
    }

    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        _metadata: Option<Metadata>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            if !self.buckets.read().await.contains(&bucket) {
                anyhow::bail!("no such bucket: {bucket}");
            }
            let upload_id = Self::new_upload_id();
            self.uploads.write().await.insert(
                upload_id.clone(),
                UploadEntry {
                    bucket,
                    key,
                    content_type,
                    parts: BTreeMap::new(),
                },
            );
            Ok(upload_id)
        })
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let upload_id = upload_id.to_string();
        Box::pin(async move {
            let mut uploads = self.uploads.write().await;
            let upload = uploads
                .get_mut(&upload_id)
                .filter(|u| u.bucket == bucket && u.key == key)
                .ok_or_else(|| anyhow::anyhow!("no such upload: {upload_id}"))?;

            let etag = Self::compute_etag(&body);
            upload.parts.insert(part_number, (body, etag.clone()));
            Ok(etag)
        })
    }

    fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        max_parts: i32,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<PartSummary>>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let upload_id = upload_id.to_string();
        Box::pin(async move {
            let uploads = self.uploads.read().await;
            let upload = uploads
                .get(&upload_id)
                .filter(|u| u.bucket == bucket && u.key == key)
                .ok_or_else(|| anyhow::anyhow!("no such upload: {upload_id}"))?;

            Ok(upload
                .parts
                .iter()
                .take(max_parts.max(0) as usize)
                .map(|(part_number, (_, etag))| PartSummary {
                    part_number: *part_number,
                    etag: etag.clone(),
                })
                .collect())
        })
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<PartSummary>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let upload_id = upload_id.to_string();
        Box::pin(async move {
            let mut uploads = self.uploads.write().await;
            let upload = uploads
                .get(&upload_id)
                .filter(|u| u.bucket == bucket && u.key == key)
                .ok_or_else(|| anyhow::anyhow!("no such upload: {upload_id}"))?;

            if parts.is_empty() {
                anyhow::bail!("complete requires at least one part");
            }

            let mut data = Vec::new();
            let mut part_etags = Vec::with_capacity(parts.len());
            for summary in &parts {
                let (body, etag) = upload.parts.get(&summary.part_number).ok_or_else(|| {
                    anyhow::anyhow!("invalid part: {}", summary.part_number)
                })?;
                if *etag != summary.etag {
                    anyhow::bail!("invalid part etag for part {}", summary.part_number);
                }
                data.extend_from_slice(body);
                part_etags.push(etag.clone());
            }

            let etag = Self::composite_etag(&part_etags);
            let content_type = upload
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string());

            self.objects.write().await.insert(
                Self::object_key(&bucket, &key),
                ObjectEntry {
                    data: Bytes::from(data),
                    etag,
                    content_type,
                },
            );
            uploads.remove(&upload_id);

            Ok(Self::location(&bucket, &key))
        })
    }

    fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let upload_id = upload_id.to_string();
        Box::pin(async move {
            let mut uploads = self.uploads.write().await;
            let matches = uploads
                .get(&upload_id)
                .is_some_and(|u| u.bucket == bucket && u.key == key);
            if !matches {
                anyhow::bail!("no such upload: {upload_id}");
            }
            uploads.remove(&upload_id);
            Ok(())
        })
    }

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectHead>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            let objects = self.objects.read().await;
            let object = objects
                .get(&Self::object_key(&bucket, &key))
                .ok_or_else(|| anyhow::anyhow!("no such key: {bucket}/{key}"))?;

            Ok(ObjectHead {
                content_length: object.data.len() as i64,
                content_type: object.content_type.clone(),
            })
        })
    }

    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<DeleteOutcome>> + Send + '_>> {
        let bucket = bucket.to_string();
        let keys = keys.to_vec();
        Box::pin(async move {
            let mut objects = self.objects.write().await;
            let mut outcome = DeleteOutcome::default();
            for key in keys {
                // Deleting an absent key still counts as deleted.
                objects.remove(&Self::object_key(&bucket, &key));
                outcome.deleted.push(key);
            }
            Ok(outcome)
        })
    }

    fn list_buckets(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        Box::pin(async move {
            let mut names: Vec<String> = self.buckets.read().await.iter().cloned().collect();
            names.sort();
            Ok(names)
        })
    }
}

// -- Tests -------------------------------------------------------------------
