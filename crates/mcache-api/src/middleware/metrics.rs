//! # Prometheus Metrics
//!
//! Request and delivery counters recorded through the `metrics` facade. The
//! server binary installs the Prometheus recorder; without one installed the
//! macros are no-ops, so tests and embedders pay nothing.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Counter of handled requests, labelled by method and status.
pub const HTTP_REQUESTS_TOTAL: &str = "mcache_http_requests_total";

/// Counter of delivered files, labelled by the variant that was chosen.
pub const VARIANT_SERVED_TOTAL: &str = "mcache_variant_served_total";

/// Install the process-wide Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    metrics::describe_counter!(VARIANT_SERVED_TOTAL, "Files served, by negotiated variant");
    Ok(handle)
}

/// Record which variant (`avif`, `webp`, `br`, `gzip`, `identity`) was sent.
pub fn record_variant(variant: &'static str) {
    metrics::counter!(VARIANT_SERVED_TOTAL, "variant" => variant).increment(1);
}

/// Middleware counting every request by method and final status.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    response
}
