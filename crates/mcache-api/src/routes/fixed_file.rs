//! # Fixed-Path Files
//!
//! Serves one file at one URL path, e.g. a service worker script that must
//! live at the site root. Anything but `GET` is answered with 405.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use axum::response::Response;
use axum::routing::any;
use axum::Router;

use crate::error::AppError;
use crate::middleware::static_files::content_type_of;
use crate::send::{send_file, ResolvedFile};

/// A router serving `file` at `path`.
pub fn fixed_file<S>(path: &str, file: impl Into<PathBuf>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let file = Arc::new(file.into());
    Router::new().route(
        path,
        any(move |method: Method, headers: HeaderMap| {
            let file = Arc::clone(&file);
            async move { serve(&method, &headers, &file).await }
        }),
    )
}

async fn serve(method: &Method, headers: &HeaderMap, file: &Path) -> Result<Response, AppError> {
    if *method != Method::GET {
        return Err(AppError::MethodNotAllowed(format!("{method} on a fixed file")));
    }
    let metadata = match tokio::fs::metadata(file).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(AppError::NotFound(file.display().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound(file.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    send_file(
        method,
        headers,
        ResolvedFile {
            path: file.to_path_buf(),
            metadata,
            content_type: content_type_of(file),
            encoding: None,
            max_age: None,
            negotiated: false,
        },
    )
    .await
}
