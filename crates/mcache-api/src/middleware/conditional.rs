//! # Conditional GET
//!
//! Turns a successful `GET`/`HEAD` response into `304 Not Modified` when the
//! request's validators still match. `If-None-Match` is compared weakly
//! against the response `ETag`; `If-Modified-Since` is consulted only when
//! `If-None-Match` is absent. Preconditions win over `Range`: a fresh
//! request gets 304 even when the file response was partial or
//! unsatisfiable.

use std::time::SystemTime;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

/// File response statuses that a fresh precondition replaces.
const REPLACEABLE: [StatusCode; 3] = [
    StatusCode::OK,
    StatusCode::PARTIAL_CONTENT,
    StatusCode::RANGE_NOT_SATISFIABLE,
];

/// Headers kept on a 304 response.
const KEPT_HEADERS: [header::HeaderName; 5] = [
    header::ETAG,
    header::LAST_MODIFIED,
    header::CACHE_CONTROL,
    header::VARY,
    header::CONTENT_LOCATION,
];

#[derive(Debug, Default)]
struct Preconditions {
    if_none_match: Option<String>,
    if_modified_since: Option<SystemTime>,
}

impl Preconditions {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            if_none_match: headers
                .get(header::IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
            if_modified_since: headers
                .get(header::IF_MODIFIED_SINCE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| httpdate::parse_http_date(v).ok()),
        }
    }

    fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none()
    }

    /// Whether the client's copy is still fresh for `response`.
    fn fresh(&self, response: &HeaderMap) -> bool {
        if let Some(list) = &self.if_none_match {
            let Some(etag) = response.get(header::ETAG).and_then(|v| v.to_str().ok()) else {
                return false;
            };
            return list
                .split(',')
                .map(str::trim)
                .any(|candidate| candidate == "*" || weak_eq(candidate, etag));
        }
        match (self.if_modified_since, last_modified(response)) {
            (Some(since), Some(modified)) => modified <= since,
            _ => false,
        }
    }
}

fn last_modified(headers: &HeaderMap) -> Option<SystemTime> {
    headers
        .get(header::LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
}

fn weak_eq(a: &str, b: &str) -> bool {
    a.trim_start_matches("W/") == b.trim_start_matches("W/")
}

/// Middleware answering `304` for fresh conditional requests.
pub async fn conditional_get(request: Request, next: Next) -> Response {
    let conditional = matches!(*request.method(), Method::GET | Method::HEAD);
    let preconditions = Preconditions::from_headers(request.headers());
    let response = next.run(request).await;

    if !conditional
        || preconditions.is_empty()
        || !REPLACEABLE.contains(&response.status())
        || !preconditions.fresh(response.headers())
    {
        return response;
    }

    let mut not_modified = Response::new(Body::empty());
    *not_modified.status_mut() = StatusCode::NOT_MODIFIED;
    for name in KEPT_HEADERS {
        if let Some(value) = response.headers().get(&name) {
            not_modified.headers_mut().insert(name, value.clone());
        }
    }
    not_modified
}
