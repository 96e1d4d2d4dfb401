//! # Error Types
//!
//! Defines the error type shared by the store, the filter pipeline and the
//! cache service. All errors use `thiserror` for derive-based `Display` and
//! `Error` implementations.
//!
//! ## Design
//!
//! - Client errors (`BadData`, `UnsupportedFormat`, `FilterArgument`,
//!   `InvalidIdentity`) are raised before any persistent state changes.
//! - A missing artifact is never an error; lookups return `Option`.
//! - I/O failures carry the original `std::io::Error` so callers classify
//!   them by `ErrorKind`, not by message text.

use thiserror::Error;

/// Top-level error type for media ingest, storage and variant generation.
#[derive(Error, Debug)]
pub enum MediaError {
    /// Input bytes cannot be parsed as the declared type, or probing failed.
    #[error("bad data: {0}")]
    BadData(String),

    /// Declared type is outside the input allow-list.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A variant request or filter parameter is malformed.
    #[error("invalid filter argument: {0}")]
    FilterArgument(String),

    /// An artifact name or digest string could not be parsed.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Stored bytes do not match the digest in their name.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Configuration rejected at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error from the storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadData(_)
                | Self::UnsupportedFormat(_)
                | Self::FilterArgument(_)
                | Self::InvalidIdentity(_)
        )
    }
}
