//! # mcache-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the YAML file named
//! by `MCACHE_CONFIG` (optional) plus `MCACHE_*` environment overrides.

use std::path::PathBuf;
use std::process::ExitCode;

use mcache_core::MediaConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var_os("MCACHE_CONFIG").map(PathBuf::from);
    let config = match MediaConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration rejected: {e}");
            return ExitCode::from(2);
        }
    };

    match mcache_api::serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}
