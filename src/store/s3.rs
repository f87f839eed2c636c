//! S3-compatible object store backend.
//!
//! Forwards every [`ObjectStore`] operation to an S3-compatible
//! endpoint (AWS, Ceph RGW, MinIO, ...) through `aws-sdk-s3`.
//!
//! Credentials come from the config when set explicitly, otherwise from
//! the standard AWS credential chain (env vars, `~/.aws/credentials`,
//! IAM role, etc.).

use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use super::backend::{DeleteOutcome, Metadata, ObjectHead, ObjectStore, PartSummary};

/// Object store backed by an S3-compatible endpoint.
pub struct S3Store {
    /// AWS S3 SDK client.
    client: Client,
    /// Endpoint URL used to compose object location strings.
    endpoint: String,
}

impl S3Store {
    /// Create a new `S3Store` against the given endpoint.
    ///
    /// If `endpoint_url` has no scheme, one is derived from `use_ssl`.
    /// When explicit credentials are provided they are injected as
    /// static credentials; otherwise the default chain applies.
    pub async fn new(
        endpoint_url: String,
        region: String,
        use_ssl: bool,
        force_path_style: bool,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let endpoint = if endpoint_url.contains("://") {
            endpoint_url
        } else {
            let scheme = if use_ssl { "https" } else { "http" };
            format!("{scheme}://{endpoint_url}")
        };

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .endpoint_url(&endpoint);

        if let (Some(ak), Some(sk)) = (&access_key_id, &secret_access_key) {
            let creds = aws_sdk_s3::config::Credentials::new(
                ak,
                sk,
                None, // session_token
                None, // expiry
                "ferry-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(force_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!("S3 store initialized: endpoint={}", endpoint);

        Ok(Self { client, endpoint })
    }

    /// Compose the canonical location URL of an object.
    fn location(&self, bucket: &str, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.endpoint)
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("S3 {context}: {err}")
    }
}

impl ObjectStore for S3Store {
    fn head_bucket(
        &self,
        bucket: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let bucket = bucket.to_string();
        Box::pin(async move {
            debug!("S3 head_bucket: bucket={}", bucket);

            match self.client.head_bucket().bucket(&bucket).send().await {
                Ok(_) => Ok(true),
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_not_found() {
                        Ok(false)
                    } else {
                        Err(Self::map_sdk_error("head_bucket", service_err))
                    }
                }
            }
        })
    }

    fn create_bucket(
        &self,
        bucket: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let bucket = bucket.to_string();
        Box::pin(async move {
            debug!("S3 create_bucket: bucket={}", bucket);

            match self.client.create_bucket().bucket(&bucket).send().await {
                Ok(_) => Ok(()),
                Err(e) => {
                    let service_err = e.into_service_error();
                    // Another process may have created the bucket between
                    // our probe and this call.  The backend reporting the
                    // bucket as already ours is the cross-process safety
                    // net and counts as success.
                    if service_err.is_bucket_already_owned_by_you()
                        || service_err.is_bucket_already_exists()
                    {
                        debug!("S3 create_bucket: {} already exists", bucket);
                        Ok(())
                    } else {
                        Err(Self::map_sdk_error("create_bucket", service_err))
                    }
                }
            }
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
        metadata: Option<Metadata>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            debug!("S3 put_object: bucket={} key={}", bucket, key);

            let mut req = self
                .client
                .put_object()
                .bucket(&bucket)
                .key(&key)
                .body(aws_sdk_s3::primitives::ByteStream::from(body));

            if let Some(ct) = content_type {
                req = req.content_type(ct);
            }
            if let Some(meta) = metadata {
                for (k, v) in meta {
                    req = req.metadata(k, v);
                }
            }

            req.send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e))?;

            Ok(self.location(&bucket, &key))
        })
    }

    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        metadata: Option<Metadata>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            debug!("S3 create_multipart_upload: bucket={} key={}", bucket, key);

            let mut req = self
                .client
                .create_multipart_upload()
                .bucket(&bucket)
                .key(&key);

            if let Some(ct) = content_type {
                req = req.content_type(ct);
            }
            if let Some(meta) = metadata {
                for (k, v) in meta {
                    req = req.metadata(k, v);
                }
            }

            let resp = req
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("create_multipart_upload", e))?;

            let upload_id = resp
                .upload_id()
                .ok_or_else(|| anyhow::anyhow!("backend did not return an upload id"))?
                .to_string();

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
            debug!(
                "S3 upload_part: bucket={} key={} upload_id={} part={}",
                bucket, key, upload_id, part_number
            );

            let resp = self
                .client
                .upload_part()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(aws_sdk_s3::primitives::ByteStream::from(body))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("upload_part", e))?;

            let etag = resp
                .e_tag()
                .ok_or_else(|| anyhow::anyhow!("backend did not return a part etag"))?
                .to_string();

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
            debug!(
                "S3 list_parts: bucket={} key={} upload_id={}",
                bucket, key, upload_id
            );

            let resp = self
                .client
                .list_parts()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .max_parts(max_parts)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("list_parts", e))?;

            let mut parts: Vec<PartSummary> = resp
                .parts()
                .iter()
                .filter_map(|p| {
                    let part_number = p.part_number()?;
                    let etag = p.e_tag()?.to_string();
                    Some(PartSummary { part_number, etag })
                })
                .collect();

            // ListParts is specified to return ascending part numbers;
            // sort anyway so completion never depends on backend quirks.
            parts.sort_by_key(|p| p.part_number);

            Ok(parts)
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
            debug!(
                "S3 complete_multipart_upload: bucket={} key={} upload_id={} parts={}",
                bucket,
                key,
                upload_id,
                parts.len()
            );

            let completed_parts: Vec<CompletedPart> = parts
                .into_iter()
                .map(|p| {
                    CompletedPart::builder()
                        .part_number(p.part_number)
                        .e_tag(p.etag)
                        .build()
                })
                .collect();

            let completed_upload = CompletedMultipartUpload::builder()
                .set_parts(Some(completed_parts))
                .build();

            let resp = self
                .client
                .complete_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .multipart_upload(completed_upload)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("complete_multipart_upload", e))?;

            let location = resp
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| self.location(&bucket, &key));

            Ok(location)
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
            debug!(
                "S3 abort_multipart_upload: bucket={} key={} upload_id={}",
                bucket, key, upload_id
            );

            self.client
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("abort_multipart_upload", e))?;

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
            debug!("S3 head_object: bucket={} key={}", bucket, key);

            let resp = self
                .client
                .head_object()
                .bucket(&bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("head_object", e))?;

            Ok(ObjectHead {
                content_length: resp.content_length().unwrap_or(0),
                content_type: resp.content_type().unwrap_or_default().to_string(),
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
            debug!(
                "S3 delete_objects: bucket={} keys={}",
                bucket,
                keys.len()
            );

            let objects: Vec<ObjectIdentifier> = keys
                .iter()
                .map(|k| {
                    ObjectIdentifier::builder()
                        .key(k)
                        .build()
                        .map_err(|e| Self::map_sdk_error("delete_objects build", e))
                })
                .collect::<anyhow::Result<_>>()?;

            // quiet=false so the response names every deleted key.
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(false)
                .build()
                .map_err(|e| Self::map_sdk_error("delete_objects build", e))?;

            let resp = self
                .client
                .delete_objects()
                .bucket(&bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_objects", e))?;

            let deleted = resp
                .deleted()
                .iter()
                .filter_map(|d| d.key().map(|k| k.to_string()))
                .collect();
            let failed = resp
                .errors()
                .iter()
                .filter_map(|e| e.key().map(|k| k.to_string()))
                .collect();

            Ok(DeleteOutcome { deleted, failed })
        })
    }

    fn list_buckets(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        Box::pin(async move {
            let resp = self
                .client
                .list_buckets()
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("list_buckets", e))?;

            Ok(resp
                .buckets()
                .iter()
                .filter_map(|b| b.name().map(|n| n.to_string()))
                .collect())
        })
    }
}

// -- Tests -------------------------------------------------------------------
