//! Ferry library — upload gateway for S3-compatible object storage.
//!
//! This crate provides the core components for running an upload
//! gateway: whole-file and chunked uploads, multipart session
//! orchestration, streamed part ingestion, batch deletion, and a
//! pluggable object store backend.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod bucket;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod service;
pub mod store;

use crate::config::Config;
use crate::service::UploadService;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Upload orchestration service over the object store backend.
    pub service: Arc<UploadService>,
    /// Latest backend liveness verdict, refreshed by the health worker.
    pub healthy: AtomicBool,
}
