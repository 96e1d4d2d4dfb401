//! # Image Routes
//!
//! - `POST /image` stores the raw request body, typed by `Content-Type`, and
//!   returns `201 Created` with the artifact name.
//! - `GET /image/{name}` sends the best pre-generated variant of `name` for
//!   the client's `Accept` and `Accept-Encoding`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mcache_core::Identity;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::metrics::record_variant;
use crate::negotiate::ClientCapabilities;
use crate::send::{send_file, ResolvedFile};
use crate::state::AppState;

/// Response body of a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Uploaded {
    /// Public artifact name, `<hash>.<type>`.
    pub name: String,
}

/// Build the image router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(upload))
        .route("/image/{name}", get(download))
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let declared = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::UnsupportedMediaType("missing Content-Type".into()))?;
    let identity = state.images.save(body.to_vec(), declared).await?;
    let name = identity.to_string();

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/image/{name}"))],
        Json(Uploaded { name }),
    )
        .into_response())
}

async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let identity: Identity = name
        .parse()
        .map_err(|_| AppError::NotFound(format!("no image named {name:?}")))?;
    let caps = ClientCapabilities::from_headers(&headers);

    let location = state
        .images
        .get(&identity, caps.webp, caps.brotli)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no image named {name:?}")))?;
    let metadata = tokio::fs::metadata(&location.path).await?;

    record_variant(match (location.encoding, location.media_type) {
        (Some(encoding), _) => encoding.content_encoding(),
        (None, mcache_core::MediaType::Webp) => "webp",
        _ => "identity",
    });

    let file = ResolvedFile {
        path: location.path,
        metadata,
        content_type: location.media_type.mime().to_string(),
        encoding: location.encoding,
        max_age: Some(state.config.media_max_age),
        negotiated: true,
    };
    send_file(&method, &headers, file).await
}
