//! # Application State
//!
//! Shared state for the Axum application, passed to route handlers via the
//! `State` extractor. Cheap to clone: every field is an `Arc` or a handle.

use std::sync::Arc;

use mcache_core::{MediaConfig, MediaError};
use mcache_image::PreGenerationService;
use metrics_exporter_prometheus::PrometheusHandle;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MediaConfig>,
    pub images: PreGenerationService,
    /// Render handle of the installed Prometheus recorder. `/metrics` is only
    /// mounted when this is set.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("images", &self.images)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Build the state from a validated configuration.
    pub fn new(config: MediaConfig) -> Result<Self, MediaError> {
        let images = PreGenerationService::from_config(&config)?
            .with_span(tracing::info_span!("images"));
        Ok(Self {
            config: Arc::new(config),
            images,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
