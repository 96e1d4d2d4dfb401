//! # Error Types
//!
//! A precompression batch either completes or fails as a whole. Worker
//! errors are wrapped with the index of the worker that raised them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    /// Reading or writing an asset failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The brotli or gzip encoder reported a failure.
    #[error("{codec} encoder failed: {message}")]
    Codec {
        codec: &'static str,
        message: String,
    },

    /// A worker returned an error; the batch is aborted.
    #[error("worker {worker} failed: {source}")]
    WorkerFailed {
        worker: usize,
        #[source]
        source: Box<CompressError>,
    },

    /// A worker thread panicked; the batch is aborted.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// The operating system refused to start a worker thread.
    #[error("cannot spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    /// Walking the asset tree failed.
    #[error("scan failed: {0}")]
    Scan(#[from] walkdir::Error),
}

impl CompressError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_failure_names_worker_and_cause() {
        let inner = CompressError::Codec {
            codec: "brotli",
            message: "window too small".into(),
        };
        let err = CompressError::WorkerFailed {
            worker: 3,
            source: Box::new(inner),
        };
        let msg = err.to_string();
        assert!(msg.contains("worker 3"));
        assert!(msg.contains("brotli encoder failed"));
    }

    #[test]
    fn io_error_carries_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CompressError::io("/srv/app.js")(io);
        assert!(err.to_string().contains("/srv/app.js"));
    }
}
