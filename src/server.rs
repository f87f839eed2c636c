//! Axum router construction and RPC route mapping.
//!
//! The [`app`] function wires every upload endpoint to its handler and
//! returns a ready-to-serve [`axum::Router`].  All endpoints are JSON
//! over POST under `/v1`; `/health` and `/metrics` sit outside the
//! versioned namespace.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::errors::generate_request_id;
use crate::handlers;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Build the axum [`Router`] with all upload gateway routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Infrastructure endpoints.
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Single-shot uploads.
        .route("/v1/upload/media", post(handlers::upload::upload_media))
        .route(
            "/v1/upload/multipart",
            post(handlers::upload::upload_multipart),
        )
        // Multipart session lifecycle.
        .route("/v1/upload/init", post(handlers::upload::upload_init))
        .route(
            "/v1/upload/part",
            post(handlers::part_stream::upload_part_stream),
        )
        .route(
            "/v1/upload/complete",
            post(handlers::upload::upload_complete),
        )
        .route("/v1/upload/abort", post(handlers::upload::upload_abort))
        // Object maintenance.
        .route("/v1/objects/delete", post(handlers::object::delete_objects))
        // Application state shared across all handlers.
        .with_state(state)
        // Layer ordering: inner layers run first, outer layers wrap them.
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(TraceLayer::new_for_http())
        // metrics_middleware is outer (captures full request lifecycle).
        .layer(middleware::from_fn(metrics_middleware))
        // Disable the default 2MB body size limit (uploads can be large).
        .layer(DefaultBodyLimit::disable())
}

// -- Common headers middleware -----------------------------------------------

/// Tower middleware that adds common response headers to every response:
/// - `x-request-id`: 16-character uppercase hex string
/// - `Date`: RFC 7231 formatted timestamp
/// - `Server`: `Ferry`
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // Only set x-request-id if not already present (error handler may set it)
    if !headers.contains_key("x-request-id") {
        let request_id = generate_request_id();
        headers.insert("x-request-id", HeaderValue::from_str(&request_id).unwrap());
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    headers.insert("date", HeaderValue::from_str(&date).unwrap());
    headers.insert("server", HeaderValue::from_static("Ferry"));

    response
}

// -- Health check ------------------------------------------------------------

/// `GET /health` -- 200 while the backend answers liveness probes,
/// 503 once it stops.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.healthy.load(Ordering::Relaxed) {
        (
            StatusCode::OK,
            [("content-type", "application/json")],
            r#"{"status":"ok"}"#,
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            [("content-type", "application/json")],
            r#"{"status":"unavailable"}"#,
        )
    }
}

// -- Tests -------------------------------------------------------------------
