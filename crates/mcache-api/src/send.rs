//! # File Responses
//!
//! Builds the response for a resolved file: validators, caching headers and
//! byte ranges. Every route that streams a file from disk goes through
//! [`send_file`], so range and header behaviour is identical for static
//! assets, images and videos.

use std::fs::Metadata;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use mcache_core::Encoding;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::AppError;

/// A file chosen for delivery, with the headers that describe it.
#[derive(Debug)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub metadata: Metadata,
    /// Type of the decoded content.
    pub content_type: String,
    /// Set when `path` holds an encoded sibling.
    pub encoding: Option<Encoding>,
    pub max_age: Option<u64>,
    /// Whether the choice depended on `Accept`/`Accept-Encoding`.
    pub negotiated: bool,
}

/// Byte range selected by a `Range` header against a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range: send the whole file.
    Full,
    /// Inclusive `start..=end`.
    Partial { start: u64, end: u64 },
    /// The range lies outside the file.
    Unsatisfiable,
}

/// Interpret a `Range` header for a file of `size` bytes.
///
/// Only single `bytes=` ranges are honoured. Malformed headers and
/// multi-range requests fall back to the full body.
pub fn parse_range(header: Option<&str>, size: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };

    match (first.trim(), last.trim()) {
        ("", "") => ByteRange::Full,
        ("", suffix) => match suffix.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if size == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial {
                start: size.saturating_sub(n),
                end: size - 1,
            },
            Err(_) => ByteRange::Full,
        },
        (start, end) => {
            let Ok(start) = start.parse::<u64>() else {
                return ByteRange::Full;
            };
            let end = match end {
                "" => None,
                end => match end.parse::<u64>() {
                    Ok(end) if end >= start => Some(end),
                    _ => return ByteRange::Full,
                },
            };
            if start >= size {
                return ByteRange::Unsatisfiable;
            }
            let last = size - 1;
            ByteRange::Partial {
                start,
                end: end.map_or(last, |e| e.min(last)),
            }
        }
    }
}

/// Weak validator derived from modification time and size.
pub fn weak_etag(metadata: &Metadata) -> Option<String> {
    let mtime = metadata.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
    Some(format!("W/\"{:x}-{:x}\"", mtime.as_secs(), metadata.len()))
}

/// Build the response for `file`. `HEAD` and `OPTIONS` get headers only.
pub async fn send_file(
    method: &Method,
    headers: &HeaderMap,
    file: ResolvedFile,
) -> Result<Response, AppError> {
    let size = file.metadata.len();
    let range = parse_range(
        headers.get(header::RANGE).and_then(|v| v.to_str().ok()),
        size,
    );

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, header_value(&file.content_type)?)
        .header(header::ACCEPT_RANGES, "bytes");
    if let Ok(modified) = file.metadata.modified() {
        builder = builder.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
    }
    if let Some(etag) = weak_etag(&file.metadata) {
        builder = builder.header(header::ETAG, header_value(&etag)?);
    }
    if let Some(encoding) = file.encoding {
        builder = builder.header(header::CONTENT_ENCODING, encoding.content_encoding());
    }
    if file.negotiated {
        builder = builder.header(header::VARY, "Accept, Accept-Encoding");
    }
    if let Some(max_age) = file.max_age {
        builder = builder.header(header::CACHE_CONTROL, format!("max-age={max_age}"));
    }

    let (status, start, len) = match range {
        ByteRange::Full => (StatusCode::OK, 0, size),
        ByteRange::Partial { start, end } => {
            builder = builder.header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}"));
            (StatusCode::PARTIAL_CONTENT, start, end - start + 1)
        }
        ByteRange::Unsatisfiable => {
            return builder
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{size}"))
                .body(Body::empty())
                .map_err(|e| AppError::Internal(e.to_string()));
        }
    };

    let body = if *method == Method::GET {
        let mut reader = tokio::fs::File::open(&file.path).await?;
        if start > 0 {
            reader.seek(SeekFrom::Start(start)).await?;
        }
        Body::from_stream(ReaderStream::new(reader.take(len)))
    } else {
        Body::empty()
    };

    builder
        .status(status)
        .header(header::CONTENT_LENGTH, len)
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value).map_err(|e| AppError::Internal(e.to_string()))
}
