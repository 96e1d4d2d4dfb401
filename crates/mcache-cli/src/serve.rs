//! # Serve Subcommand
//!
//! Runs the HTTP delivery service in the foreground.

use anyhow::{Context, Result};
use clap::Args;
use mcache_core::MediaConfig;

use crate::runtime;

/// Arguments for `mcache serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen port, overriding the configuration.
    #[arg(long)]
    pub port: Option<u16>,

    /// Skip static precompression at startup.
    #[arg(long)]
    pub no_precompress: bool,
}

/// Execute the serve subcommand. Returns only when the server stops.
pub fn run_serve(args: &ServeArgs, mut config: MediaConfig) -> Result<u8> {
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.no_precompress {
        config.precompress_on_start = false;
    }
    runtime()?
        .block_on(mcache_api::serve(config))
        .context("delivery service stopped")?;
    Ok(0)
}
