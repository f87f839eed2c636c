//! Ferry -- upload gateway for S3-compatible object storage.
//!
//! The gateway is stateless: all upload session state lives in the
//! backend, so SIGTERM/SIGINT handlers only stop accepting connections
//! and wait for in-flight uploads before exiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use metrics::gauge;
use tracing::{info, warn};

/// Command-line arguments for the Ferry server.
#[derive(Parser, Debug)]
#[command(
    name = "ferry",
    version,
    about = "Upload gateway for S3-compatible object storage"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "ferry.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing / logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from {}", cli.config);
    let config = ferry::config::load_config(&cli.config)?;

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize Prometheus metrics recorder and register metric descriptions.
    if config.observability.metrics {
        ferry::metrics::init_metrics();
        ferry::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // Initialize the object store backend based on config.
    let store: Arc<dyn ferry::store::backend::ObjectStore> = match config.store.backend.as_str() {
        "s3" => {
            let s3_config = config.store.s3.as_ref().ok_or_else(|| {
                anyhow::anyhow!("store.backend is 's3' but store.s3 config section is missing")
            })?;
            let store = ferry::store::s3::S3Store::new(
                s3_config.endpoint.clone(),
                s3_config.region.clone(),
                s3_config.use_ssl,
                s3_config.force_path_style,
                (!s3_config.access_key_id.is_empty()).then(|| s3_config.access_key_id.clone()),
                (!s3_config.secret_access_key.is_empty())
                    .then(|| s3_config.secret_access_key.clone()),
            )
            .await?;
            info!(
                "S3 object store initialized: endpoint={} region={}",
                s3_config.endpoint, s3_config.region
            );
            Arc::new(store)
        }
        "memory" | _ => {
            info!("In-memory object store initialized");
            Arc::new(ferry::store::memory::MemoryStore::new())
        }
    };

    // Build AppState.
    let state = Arc::new(ferry::AppState {
        config: config.clone(),
        service: Arc::new(ferry::service::UploadService::new(store)),
        healthy: AtomicBool::new(false),
    });

    // Background health worker: probe the backend on an interval and
    // publish the verdict for the /health endpoint.
    let health_state = state.clone();
    let check_interval = Duration::from_secs(config.health.check_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(check_interval);
        loop {
            ticker.tick().await;
            let alive = health_state.service.backend_alive().await;
            let was_alive = health_state.healthy.swap(alive, Ordering::Relaxed);
            gauge!(ferry::metrics::BACKEND_UP).set(if alive { 1.0 } else { 0.0 });
            if alive != was_alive {
                if alive {
                    info!("object store backend is reachable");
                } else {
                    warn!("object store backend is unreachable");
                }
            }
        }
    });

    let app = ferry::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Ferry listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new connections,
    // wait for in-flight requests to complete, then exit.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Ferry shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
