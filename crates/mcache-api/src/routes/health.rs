//! # Health Checks
//!
//! Kubernetes-style liveness and readiness checks, mounted without any negotiation or body limits.

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

/// Liveness: always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness: 200 when both storage roots are usable directories.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    for root in [&state.config.media_root, &state.config.video_root] {
        tokio::fs::create_dir_all(root).await.map_err(|e| {
            AppError::ServiceUnavailable(format!("storage root {}: {e}", root.display()))
        })?;
    }
    Ok("ready")
}
