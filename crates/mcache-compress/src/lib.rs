//! # mcache-compress: Static Asset Precompression
//!
//! Produces `.br` and `.gz` siblings next to the files of a static asset
//! tree so the delivery middleware can serve them without request-time
//! compression.
//!
//! - [`scanner`] walks the tree and keeps compressible files above the size
//!   threshold.
//! - [`partition`] splits those files into size-balanced worker packages.
//! - [`pool`] runs one typed unit of work per worker thread and fails the
//!   whole batch if any unit fails.
//! - [`precompress`] ties the three together; [`compress_file`] is the
//!   per-file step and is usable on its own.
//!
//! The brotli/gzip codecs in [`codec`] are shared with the image pipeline,
//! which brotli-encodes large SVG documents.

pub mod codec;
pub mod error;
pub mod partition;
pub mod pool;
pub mod precompress;
pub mod scanner;

pub use codec::{brotli_compress, gzip_compress};
pub use error::CompressError;
pub use partition::{partition, worker_count, WorkerPackage};
pub use pool::WorkerPool;
pub use precompress::{compress_file, precompress_dir, FileOutcome, PrecompressReport, Precompressor};
pub use scanner::{AssetScanner, FileInfo};
