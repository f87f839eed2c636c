//! Bucket name normalization and idempotent bucket provisioning.
//!
//! Every path that writes to storage goes through
//! [`BucketProvisioner::ensure_exists`] first.  The provisioner is the
//! single mutual-exclusion point for bucket creation: the exists-then-
//! create sequence is not atomic at the backend, so it is serialized
//! behind one lock per provisioner instance.  The lock covers only the
//! check-and-create decision, never the data transfer that follows.
//!
//! This closes the create race within one process.  Races with other
//! processes are handled by the backend treating "already owned by you"
//! as a non-fatal outcome (see the S3 store).

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::UploadError;
use crate::store::backend::ObjectStore;

/// Normalize a caller-supplied bucket name to the backend's naming
/// constraints: lower-case, with every run of non-alphanumeric
/// characters collapsed to a single hyphen.
pub fn normalize_bucket_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            in_run = false;
        } else if !in_run {
            // Leading and trailing runs map to a hyphen too.
            out.push('-');
            in_run = true;
        }
    }
    out
}

/// Idempotently ensures buckets exist before any object operation.
pub struct BucketProvisioner {
    store: Arc<dyn ObjectStore>,
    /// Guards the exists-then-create critical section.
    create_lock: Mutex<()>,
}

impl BucketProvisioner {
    /// Create a provisioner over the given store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            create_lock: Mutex::new(()),
        }
    }

    /// Ensure the bucket exists, creating it if necessary.
    ///
    /// On success `bucket` has been rewritten to its normalized form so
    /// every downstream call addresses the same bucket the provisioner
    /// just ensured.  The caller's operation must not proceed when this
    /// returns an error.
    pub async fn ensure_exists(&self, bucket: &mut String) -> Result<(), UploadError> {
        if bucket.is_empty() {
            return Err(UploadError::MissingField {
                field: "bucket name",
            });
        }

        let normalized = normalize_bucket_name(bucket);

        let _guard = self.create_lock.lock().await;

        let exists = self
            .store
            .head_bucket(&normalized)
            .await
            .map_err(|e| UploadError::backend("probe bucket", &normalized, "", e))?;

        if !exists {
            debug!("bucket {} absent, creating", normalized);
            self.store
                .create_bucket(&normalized)
                .await
                .map_err(|e| UploadError::backend("create bucket", &normalized, "", e))?;
        }

        *bucket = normalized;
        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------
