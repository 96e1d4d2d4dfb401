//! # mcache-cli: Media Cache Command-Line Interface
//!
//! Batch entry points around the library crates. Argument parsing lives in
//! the `*Args` structs; each `run_*` handler delegates to the domain crates
//! and returns the process exit code.
//!
//! ## Subcommands
//!
//! - `mcache precompress [DIR]`: write `.br`/`.gz` siblings for a static tree.
//! - `mcache save <FILE>`: ingest an image and print its name.
//! - `mcache resolve <NAME>`: print the path of the best stored variant.
//! - `mcache verify <NAME>`: recompute and check a stored artifact's digest.
//! - `mcache serve`: run the HTTP delivery service.
//!
//! ```bash
//! mcache precompress dist/
//! mcache save photo.jpeg
//! mcache resolve 3f2a...c9.jpg --webp
//! ```

pub mod media;
pub mod precompress;
pub mod serve;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

/// Multi-threaded runtime for handlers that call async library code.
pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_runs_futures() {
        let rt = runtime().unwrap();
        assert_eq!(rt.block_on(async { 40 + 2 }), 42);
    }
}
