//! Configuration loading and types for the upload gateway.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Each subsection governs a different part of the
//! system: networking, the object store backend, health probing, and
//! logging.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Object store backend settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Backend health probing settings.
    #[serde(default)]
    pub health: HealthConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics + health endpoint).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Object store backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend type: `memory` or `s3`.
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// S3-compatible backend configuration.
    #[serde(default)]
    pub s3: Option<S3StoreConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            s3: None,
        }
    }
}

/// S3-compatible backend configuration (AWS, MinIO, LocalStack, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct S3StoreConfig {
    /// Endpoint host:port or full URL.
    pub endpoint: String,

    /// Region to present to the backend.
    #[serde(default = "default_region")]
    pub region: String,

    /// Explicit access key (falls back to env/credential chain).
    #[serde(default)]
    pub access_key_id: String,

    /// Explicit secret key (falls back to env/credential chain).
    #[serde(default)]
    pub secret_access_key: String,

    /// Use HTTPS when the endpoint has no explicit scheme.
    #[serde(default)]
    pub use_ssl: bool,

    /// Force path-style URL addressing (required by most non-AWS
    /// S3-compatible backends).
    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

/// Backend health probing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Seconds between backend liveness probes.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { metrics: true }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_check_interval() -> u64 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

// -- Tests -------------------------------------------------------------------
