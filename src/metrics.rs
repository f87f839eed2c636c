//! Prometheus metrics for the upload gateway.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides a Tower-compatible middleware for
//! HTTP RED metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "ferry_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ferry_http_request_duration_seconds";

/// Total single-shot uploads (counter). Labels: kind (media | multipart).
pub const UPLOADS_TOTAL: &str = "ferry_uploads_total";

/// Total multipart session events (counter). Labels: event (init | complete | abort).
pub const UPLOAD_SESSIONS_TOTAL: &str = "ferry_upload_sessions_total";

/// Total streamed parts (counter). Labels: status (ok | error | recv_error).
pub const PARTS_TOTAL: &str = "ferry_parts_total";

/// Total deleted objects (counter).
pub const DELETED_OBJECTS_TOTAL: &str = "ferry_deleted_objects_total";

/// Backend reachability as seen by the health worker (gauge, 0 or 1).
pub const BACKEND_UP: &str = "ferry_backend_up";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to call
/// multiple times (e.g. in tests). Returns a reference to the global handle.
pub fn init_metrics() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    })
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(UPLOADS_TOTAL, "Total single-shot uploads by kind");
    describe_counter!(
        UPLOAD_SESSIONS_TOTAL,
        "Total multipart session events by type"
    );
    describe_counter!(PARTS_TOTAL, "Total streamed parts by outcome");
    describe_counter!(DELETED_OBJECTS_TOTAL, "Total deleted objects");
    describe_gauge!(BACKEND_UP, "Backend reachability (1 = reachable)");
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation to avoid feedback loops.
/// Must be the outermost layer so it captures the full request lifecycle.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    // Do not instrument the metrics endpoint itself.
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

// -- Path normalization -------------------------------------------------------

/// Normalize a request path to a fixed label value.
///
/// The route table is static, so any path outside it is bucketed as
/// `other` to keep label cardinality bounded.
fn normalize_path(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/v1/upload/media" | "/v1/upload/multipart"
        | "/v1/upload/init" | "/v1/upload/part" | "/v1/upload/complete" | "/v1/upload/abort"
        | "/v1/objects/delete" => path.to_string(),
        _ => "other".to_string(),
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus recorder not initialized");
    let body = handle.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_known_routes() {
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/v1/upload/part"), "/v1/upload/part");
        assert_eq!(normalize_path("/v1/objects/delete"), "/v1/objects/delete");
    }

    #[test]
    fn test_normalize_path_unknown_routes_are_bucketed() {
        assert_eq!(normalize_path("/"), "other");
        assert_eq!(normalize_path("/v1/upload/nope"), "other");
        assert_eq!(normalize_path("/some/bucket/key"), "other");
    }
}
