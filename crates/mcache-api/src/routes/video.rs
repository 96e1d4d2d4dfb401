//! # Video Routes
//!
//! Videos are stored as uploaded, without variants, under
//! `<sha256>.<ext>` in `video_root`. The extension comes from the upload's
//! `Content-Type`. Downloads support byte ranges for seeking.

use std::path::Path as FsPath;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use mcache_core::sha256_digest;
use mcache_store::write_once;

use crate::error::AppError;
use crate::middleware::static_files::content_type_of;
use crate::send::{send_file, ResolvedFile};
use crate::state::AppState;

/// Build the video router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/video", post(upload))
        .route("/video/{name}", get(download))
}

/// File extension for an uploaded MIME type.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim();
    let extensions = mime_guess::get_mime_extensions_str(essence)?;
    // prefer the extension that maps back to this type
    extensions
        .iter()
        .copied()
        .find(|ext| {
            mime_guess::from_ext(ext)
                .first()
                .is_some_and(|m| m.essence_str().eq_ignore_ascii_case(essence))
        })
        .or_else(|| extensions.first().copied())
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::UnsupportedMediaType("missing Content-Type".into()))?;
    let extension = extension_for(content_type).ok_or_else(|| {
        AppError::UnsupportedMediaType(format!("no file extension for {content_type}"))
    })?;

    let name = format!("{}.{extension}", sha256_digest(&body).to_hex());
    let outcome = write_once(&state.config.video_root, &name, &body).await?;
    tracing::info!(%name, size = body.len(), ?outcome, "stored video");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/video/{name}"))],
    )
        .into_response())
}

async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("no video named {name:?}"));
    // basename only
    let file_name = FsPath::new(&name).file_name().ok_or_else(not_found)?;
    if file_name != name.as_str() {
        return Err(not_found());
    }
    let path = state.config.video_root.join(file_name);

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(not_found()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let file = ResolvedFile {
        content_type: content_type_of(&path),
        path,
        metadata,
        encoding: None,
        max_age: Some(state.config.media_max_age),
        negotiated: false,
    };
    send_file(&method, &headers, file).await
}
