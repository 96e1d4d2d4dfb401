//! # Precompression Scheduler
//!
//! Sizes the worker pool from the total byte volume, partitions the files
//! and runs [`compress_file`] for each of them. Small batches run on the
//! calling thread with no partitioning at all.
//!
//! A failed batch is reported as a failure even though some files may have
//! been compressed. Those siblings stay valid: [`compress_file`] skips any
//! file whose `.br` and `.gz` are both present and not older than the
//! original, so retrying the whole batch is cheap.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use mcache_core::{Encoding, MediaConfig, WorkerBounds};

use crate::codec::{brotli_compress, gzip_compress, BROTLI_QUALITY, GZIP_LEVEL};
use crate::error::CompressError;
use crate::partition::{partition, worker_count};
use crate::pool::WorkerPool;
use crate::scanner::{AssetScanner, FileInfo};

/// What [`compress_file`] did with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// New `.br` and `.gz` siblings were written.
    Compressed,
    /// Both siblings were already up to date.
    Fresh,
}

/// Summary of one precompression batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecompressReport {
    pub files: usize,
    pub compressed: usize,
    pub fresh: usize,
    pub input_bytes: u64,
    /// Worker threads used; zero when the batch ran on the calling thread.
    pub workers: usize,
}

/// Path of the encoded sibling: the original path with `.br` / `.gz` appended.
pub fn sibling_path(path: &Path, encoding: Encoding) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(encoding.extension());
    PathBuf::from(name)
}

/// Write brotli and gzip siblings for one file unless both are up to date.
pub fn compress_file(path: &Path) -> Result<FileOutcome, CompressError> {
    if siblings_fresh(path)? {
        return Ok(FileOutcome::Fresh);
    }
    let data = fs::read(path).map_err(CompressError::io(path))?;
    write_sibling(path, Encoding::Brotli, &brotli_compress(&data, BROTLI_QUALITY)?)?;
    write_sibling(path, Encoding::Gzip, &gzip_compress(&data, GZIP_LEVEL)?)?;
    Ok(FileOutcome::Compressed)
}

fn siblings_fresh(path: &Path) -> Result<bool, CompressError> {
    let original = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(CompressError::io(path))?;

    for encoding in [Encoding::Brotli, Encoding::Gzip] {
        let sibling = sibling_path(path, encoding);
        match fs::metadata(&sibling).and_then(|m| m.modified()) {
            Ok(modified) if modified >= original => {}
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(CompressError::io(sibling)(e)),
        }
    }
    Ok(true)
}

// Rename into place so an interrupted run never leaves a truncated sibling
// that looks fresh.
fn write_sibling(path: &Path, encoding: Encoding, bytes: &[u8]) -> Result<(), CompressError> {
    let target = sibling_path(path, encoding);
    let mut temp = target.clone().into_os_string();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, bytes).map_err(CompressError::io(&temp))?;
    fs::rename(&temp, &target).map_err(CompressError::io(&target))
}

/// Schedules precompression of a set of files.
#[derive(Debug, Clone)]
pub struct Precompressor {
    bounds: WorkerBounds,
    parallelism: usize,
    pool: WorkerPool,
}

impl Precompressor {
    pub fn new(bounds: WorkerBounds) -> Self {
        Self {
            bounds,
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            pool: WorkerPool::new("precompress"),
        }
    }

    /// Override the detected hardware parallelism.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Compress every file in `files`. Blocks until all workers finish.
    pub fn run(&self, files: Vec<FileInfo>) -> Result<PrecompressReport, CompressError> {
        let started = Instant::now();
        let input_bytes: u64 = files.iter().map(|f| f.size).sum();
        let file_count = files.len();
        let workers = worker_count(input_bytes, &self.bounds, self.parallelism);

        let (outcomes, workers) = if workers < self.bounds.min.max(2) {
            let outcomes = files
                .iter()
                .map(|f| compress_file(&f.path))
                .collect::<Result<Vec<_>, _>>()?;
            (outcomes, 0)
        } else {
            let packages = partition(files, workers);
            tracing::debug!(
                workers,
                sizes = ?packages.iter().map(|p| p.size).collect::<Vec<_>>(),
                "partitioned precompression batch"
            );
            let outcomes = self
                .pool
                .run(packages, |package| {
                    package
                        .files
                        .iter()
                        .map(|path| compress_file(path))
                        .collect::<Result<Vec<_>, _>>()
                })?
                .into_iter()
                .flatten()
                .collect();
            (outcomes, workers)
        };

        let compressed = outcomes
            .iter()
            .filter(|o| **o == FileOutcome::Compressed)
            .count();
        let report = PrecompressReport {
            files: file_count,
            compressed,
            fresh: file_count - compressed,
            input_bytes,
            workers,
        };
        tracing::info!(
            files = report.files,
            compressed = report.compressed,
            fresh = report.fresh,
            input_bytes = report.input_bytes,
            workers = report.workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "precompression finished"
        );
        Ok(report)
    }
}

/// Scan `root` with the configured extensions and threshold and
/// precompress everything found.
pub fn precompress_dir(root: &Path, config: &MediaConfig) -> Result<PrecompressReport, CompressError> {
    let files = AssetScanner::from_config(root, config).scan()?;
    Precompressor::new(config.workers.clone()).run(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_path_appends_extension() {
        assert_eq!(
            sibling_path(Path::new("/dist/app.js"), Encoding::Brotli),
            PathBuf::from("/dist/app.js.br")
        );
        assert_eq!(
            sibling_path(Path::new("index.html"), Encoding::Gzip),
            PathBuf::from("index.html.gz")
        );
    }

    #[test]
    fn compress_file_writes_both_siblings_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        fs::write(&path, "console.log('x');\n".repeat(100)).unwrap();

        assert_eq!(compress_file(&path).unwrap(), FileOutcome::Compressed);
        assert!(dir.path().join("app.js.br").is_file());
        assert!(dir.path().join("app.js.gz").is_file());
        assert!(!dir.path().join("app.js.br.tmp").exists());

        assert_eq!(compress_file(&path).unwrap(), FileOutcome::Fresh);
    }

    #[test]
    fn missing_sibling_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.css");
        fs::write(&path, "a { b: c }\n".repeat(200)).unwrap();

        compress_file(&path).unwrap();
        fs::remove_file(dir.path().join("style.css.gz")).unwrap();
        assert_eq!(compress_file(&path).unwrap(), FileOutcome::Compressed);
    }

    #[test]
    fn stale_sibling_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<p>hello</p>\n".repeat(200)).unwrap();
        compress_file(&path).unwrap();

        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert_eq!(compress_file(&path).unwrap(), FileOutcome::Compressed);
    }

    #[test]
    fn missing_original_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = compress_file(&dir.path().join("gone.js")).unwrap_err();
        assert!(matches!(err, CompressError::Io { .. }));
    }
}
