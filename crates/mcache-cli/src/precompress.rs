//! # Precompress Subcommand
//!
//! Writes brotli and gzip siblings for every eligible file below a
//! directory, using the configured extensions, size threshold and worker
//! bounds.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use mcache_compress::precompress_dir;
use mcache_core::MediaConfig;

/// Arguments for `mcache precompress`.
#[derive(Args, Debug)]
pub struct PrecompressArgs {
    /// Directory to precompress. Defaults to the configured `static_root`.
    pub dir: Option<PathBuf>,
}

/// Execute the precompress subcommand.
pub fn run_precompress(args: &PrecompressArgs, config: &MediaConfig) -> Result<u8> {
    let root: &Path = args.dir.as_deref().unwrap_or(config.static_root.as_path());
    if !root.is_dir() {
        anyhow::bail!("not a directory: {}", root.display());
    }

    let report = precompress_dir(root, config)
        .with_context(|| format!("precompression of {} failed", root.display()))?;

    println!("  root:       {}", root.display());
    println!("  files:      {}", report.files);
    println!("  compressed: {}", report.compressed);
    println!("  fresh:      {}", report.fresh);
    println!("  bytes:      {}", report.input_bytes);
    println!("  workers:    {}", report.workers);
    Ok(0)
}
