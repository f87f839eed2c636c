//! RPC handlers and wire types for the upload gateway.
//!
//! Every endpoint is JSON over POST; the part-ingestion endpoint
//! additionally streams newline-delimited JSON in both directions.
//! Binary payloads travel as base64 strings inside the JSON envelope.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::store::backend::Metadata;

pub mod object;
pub mod part_stream;
pub mod upload;

/// Serde adapter for optional binary fields carried as base64 strings.
///
/// A missing or null field deserializes to `None`; malformed base64 is
/// a deserialization error, rejected before the handler runs.
pub mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Bytes>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Bytes>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Bytes::from)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

// -- Wire types ----------------------------------------------------------------

/// Request body for `POST /v1/upload/media`.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadMediaRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Whole file content, base64-encoded.
    #[serde(default, with = "base64_body")]
    pub file: Option<Bytes>,
}

/// Request body for `POST /v1/upload/multipart`.
///
/// Same as [`UploadMediaRequest`] plus a mandatory metadata map.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadMultipartRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, with = "base64_body")]
    pub file: Option<Bytes>,
}

/// Response for the single-shot upload endpoints.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadLocationResponse {
    /// Backend URL of the stored object.
    pub location: String,
}

/// Request body for `POST /v1/upload/init`.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadInitRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Response for `POST /v1/upload/init`.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadInitResponse {
    pub upload_id: String,
    pub key: String,
    /// Normalized bucket name; subsequent part/complete/abort calls
    /// should address this bucket.
    pub bucket: String,
}

/// One inbound line on the `POST /v1/upload/part` stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadPartMessage {
    #[serde(default)]
    pub upload_id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub part_number: i64,
    /// Part content, base64-encoded.
    #[serde(default, with = "base64_body")]
    pub part: Option<Bytes>,
}

/// One outbound line on the `POST /v1/upload/part` stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadPartResponse {
    pub code: u16,
    pub message: String,
}

/// Request body for `POST /v1/upload/complete`.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadCompleteRequest {
    #[serde(default)]
    pub upload_id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub bucket: String,
}

/// Response for `POST /v1/upload/complete`: attributes of the
/// assembled object.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadCompleteResponse {
    pub content_length: i64,
    pub content_type: String,
}

/// Request body for `POST /v1/upload/abort`.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadAbortRequest {
    #[serde(default)]
    pub upload_id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub bucket: String,
}

/// Response for `POST /v1/upload/abort`.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadAbortResponse {
    pub status: bool,
}

/// Request body for `POST /v1/objects/delete`.
#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteObjectsRequest {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Response for `POST /v1/objects/delete`: per-key outcome partition.
#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteObjectsResponse {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

// -- Tests -------------------------------------------------------------------
