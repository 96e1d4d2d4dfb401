//! # mcache-api: Media Delivery Service
//!
//! Axum application serving content-addressed images and videos and a
//! negotiated static asset tree.
//!
//! ## API Surface
//!
//! | Route                    | Module                 | Behaviour                          |
//! |--------------------------|------------------------|------------------------------------|
//! | `POST /image`            | [`routes::image`]      | store image, `201` + name          |
//! | `GET /image/{name}`      | [`routes::image`]      | best pre-generated variant         |
//! | `POST /video`            | [`routes::video`]      | write-once raw store               |
//! | `GET /video/{name}`      | [`routes::video`]      | range-capable download             |
//! | `GET /health/*`          | [`routes::health`]     | liveness / readiness               |
//! | `GET /metrics`           | this module            | Prometheus text exposition         |
//! | configured fixed paths   | [`routes::fixed_file`] | one file, `405` for non-`GET`      |
//! | everything else          | [`middleware::static_files`] | negotiated file from `static_root` |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → metrics → conditional GET → static files → body limit → routes
//! ```
//!
//! The static middleware answers whatever it finds on disk and hands
//! everything else to the routes, so a file in `static_root` shadows a route
//! with the same path.

pub mod error;
pub mod middleware;
pub mod negotiate;
pub mod routes;
pub mod send;
pub mod state;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use mcache_compress::{precompress_dir, CompressError, PrecompressReport};
use mcache_core::MediaConfig;
use tower_http::trace::TraceLayer;

use crate::middleware::conditional::conditional_get;
use crate::middleware::metrics::{install_recorder, track_requests};
use crate::middleware::static_files::{serve_static, StaticFiles};

pub use error::{AppError, ServeError};
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let files = Arc::new(StaticFiles::from_config(&state.config));

    let mut router = Router::new()
        .merge(routes::image::router())
        .merge(routes::video::router())
        .merge(routes::health::router());
    for (path, file) in &state.config.fixed_files {
        router = router.merge(routes::fixed_file(path, file.clone()));
    }
    if state.metrics.is_some() {
        router = router.route("/metrics", get(prometheus_metrics));
    }

    router
        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .layer(from_fn_with_state(files, serve_static))
        .layer(from_fn(conditional_get))
        .layer(from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prometheus scrape endpoint.
async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => AppError::NotFound("metrics are disabled".into()).into_response(),
    }
}

/// Precompress `static_root` on the blocking pool. A missing root is not an
/// error: there is simply nothing to serve yet.
pub async fn precompress_static(config: Arc<MediaConfig>) -> Result<PrecompressReport, CompressError> {
    if !config.static_root.is_dir() {
        tracing::info!(root = %config.static_root.display(), "no static root, skipping precompression");
        return Ok(PrecompressReport::default());
    }
    let root = config.static_root.clone();
    tokio::task::spawn_blocking(move || precompress_dir(&config.static_root, &config))
        .await
        .map_err(|e| CompressError::Io {
            path: root,
            source: std::io::Error::other(format!("precompression task failed: {e}")),
        })?
}

/// Run the service on `0.0.0.0:<port>` until the process stops.
///
/// Installs the global Prometheus recorder, so call this at most once per
/// process. `static_root` is precompressed first when `precompress_on_start`
/// is set.
pub async fn serve(config: MediaConfig) -> Result<(), ServeError> {
    let port = config.port;
    let metrics = install_recorder()?;
    let state = AppState::new(config)?.with_metrics(metrics);

    if state.config.precompress_on_start {
        let report = precompress_static(state.config.clone()).await?;
        tracing::info!(
            files = report.files,
            compressed = report.compressed,
            workers = report.workers,
            "static assets precompressed"
        );
    }

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { port, source })?;
    tracing::info!("mcache listening on {}", addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
