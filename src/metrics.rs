//! Prometheus metrics.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides a Tower-compatible middleware for
//! HTTP RED metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "sharebox_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "sharebox_http_request_duration_seconds";

/// Total accepted uploads (counter).
pub const UPLOADS_TOTAL: &str = "sharebox_uploads_total";

/// Total served downloads (counter).
pub const DOWNLOADS_TOTAL: &str = "sharebox_downloads_total";

/// Total denied access attempts (counter). Labels: reason.
pub const ACCESS_DENIED_TOTAL: &str = "sharebox_access_denied_total";

/// Total sweeper cycles (counter).
pub const SWEEPER_RUNS_TOTAL: &str = "sharebox_sweeper_runs_total";

/// Total files tombstoned by the expiry pass (counter).
pub const SWEEPER_EXPIRED_TOTAL: &str = "sharebox_sweeper_expired_total";

/// Total orphan blobs deleted (counter).
pub const SWEEPER_ORPHANS_DELETED_TOTAL: &str = "sharebox_sweeper_orphans_deleted_total";

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
    describe_counter!(UPLOADS_TOTAL, "Total accepted uploads");
    describe_counter!(DOWNLOADS_TOTAL, "Total served downloads");
    describe_counter!(ACCESS_DENIED_TOTAL, "Total denied access attempts by reason");
    describe_counter!(SWEEPER_RUNS_TOTAL, "Total sweeper cycles");
    describe_counter!(SWEEPER_EXPIRED_TOTAL, "Total files swept by the expiry pass");
    describe_counter!(SWEEPER_ORPHANS_DELETED_TOTAL, "Total orphan blobs deleted");
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

/// Normalize an actual request path to a route template for metric labels.
///
/// This prevents high-cardinality labels from unique file ids.
///
/// Examples:
/// - `/health` -> `/health`
/// - `/api/files/download/a1b2c3` -> `/api/files/download/{id}`
/// - `/api/files/a1b2c3` -> `/api/files/{id}`
/// - `/api/admin/settings` -> `/api/admin/settings`
fn normalize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/api/files/download/") {
        if !rest.is_empty() {
            return "/api/files/download/{id}".to_string();
        }
    }
    if let Some(rest) = path.strip_prefix("/api/files/") {
        match rest {
            "" | "upload" | "stats" | "verify-password" => {}
            _ => return "/api/files/{id}".to_string(),
        }
    }
    path.to_string()
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
