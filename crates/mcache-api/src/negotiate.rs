//! # Content Negotiation
//!
//! Reads `Accept` and `Accept-Encoding` into the capability flags that drive
//! variant selection.
//!
//! Image formats are matched literally: `image/*` or `*/*` do not count as
//! accepting WebP or AVIF, since almost every client sends a wildcard.
//! Encodings follow the usual rules: `*` applies to unlisted codings and a
//! coding is chosen only when it is preferred at least as much as `identity`.

use axum::http::{header, HeaderMap};

/// What the client accepts, as far as variant selection is concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilities {
    pub avif: bool,
    pub webp: bool,
    pub brotli: bool,
    pub gzip: bool,
}

impl ClientCapabilities {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accept = header_str(headers, header::ACCEPT);
        let encodings = header_str(headers, header::ACCEPT_ENCODING);
        Self {
            avif: accepts_literal(accept, "image/avif"),
            webp: accepts_literal(accept, "image/webp"),
            brotli: prefers_coding(encodings, "br"),
            gzip: prefers_coding(encodings, "gzip"),
        }
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Split a header list into `(token, q)` pairs. Unparseable `q` counts as 1.
fn weighted(list: &str) -> impl Iterator<Item = (&str, f32)> {
    list.split(',').filter_map(|item| {
        let mut parts = item.split(';');
        let token = parts.next()?.trim();
        if token.is_empty() {
            return None;
        }
        let q = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        Some((token, q))
    })
}

fn accepts_literal(accept: Option<&str>, media_type: &str) -> bool {
    accept.is_some_and(|list| {
        weighted(list).any(|(token, q)| token.eq_ignore_ascii_case(media_type) && q > 0.0)
    })
}

/// Quality of `coding` in an `Accept-Encoding` list.
fn coding_quality(list: &str, coding: &str) -> f32 {
    let mut wildcard = None;
    for (token, q) in weighted(list) {
        if token.eq_ignore_ascii_case(coding) {
            return q;
        }
        if token == "*" {
            wildcard = Some(q);
        }
    }
    match wildcard {
        Some(q) => q,
        // identity stays acceptable unless refused explicitly
        None if coding == "identity" => 1.0,
        None => 0.0,
    }
}

fn prefers_coding(encodings: Option<&str>, coding: &str) -> bool {
    let Some(list) = encodings else {
        return false;
    };
    let q = coding_quality(list, coding);
    q > 0.0 && q >= coding_quality(list, "identity")
}
