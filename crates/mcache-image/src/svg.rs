//! # SVG Minification
//!
//! A lossless minifier: drops comments and whitespace-only text between
//! tags. Text content, CDATA sections and whitespace inside `<text>`,
//! `<tspan>` and `<textPath>` are kept byte for byte, since they render.

use mcache_core::{CacheTag, MediaError, MediaType};

use crate::filter::{FilterOutcome, ImageFilter};

const TEXT_ELEMENTS: [&str; 3] = ["text", "tspan", "textPath"];

/// Minify an SVG document. Fails with `BadData` on an unterminated comment,
/// CDATA section or tag.
pub fn minify(document: &str) -> Result<String, MediaError> {
    let mut out = String::with_capacity(document.len());
    let mut rest = document.trim();
    let mut text_depth = 0usize;

    while let Some(open) = rest.find('<') {
        let text = &rest[..open];
        if text_depth > 0 || !text.trim().is_empty() {
            out.push_str(text);
        }
        rest = &rest[open..];

        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| MediaError::BadData("unterminated SVG comment".into()))?;
            rest = &after[end + 3..];
        } else if rest.starts_with("<![CDATA[") {
            let end = rest
                .find("]]>")
                .ok_or_else(|| MediaError::BadData("unterminated CDATA section".into()))?;
            out.push_str(&rest[..end + 3]);
            rest = &rest[end + 3..];
        } else {
            let end = tag_end(rest)
                .ok_or_else(|| MediaError::BadData("unterminated SVG tag".into()))?;
            let tag = &rest[..=end];
            track_text_depth(tag, &mut text_depth);
            out.push_str(tag);
            rest = &rest[end + 1..];
        }
    }
    if text_depth > 0 || !rest.trim().is_empty() {
        out.push_str(rest);
    }
    Ok(out)
}

// Index of the `>` closing the tag at the start of `s`, skipping quoted
// attribute values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn track_text_depth(tag: &str, depth: &mut usize) {
    let (closing, body) = match tag.strip_prefix("</") {
        Some(body) => (true, body),
        None => (false, &tag[1..]),
    };
    let name: String = body
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect();
    let local = name.rsplit(':').next().unwrap_or(&name);
    if !TEXT_ELEMENTS.contains(&local) {
        return;
    }
    if closing {
        *depth = depth.saturating_sub(1);
    } else if !tag.ends_with("/>") {
        *depth += 1;
    }
}

/// Whether `bytes` look like an SVG document: UTF-8 text with an `<svg`
/// element.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok_and(|text| text.contains("<svg"))
}

/// [`ImageFilter`] adapter over [`minify`] for the `{format: svg}` variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgMinifier;

impl ImageFilter for SvgMinifier {
    fn accepts(&self, tag: &CacheTag) -> bool {
        tag.format == Some(MediaType::Svg) && tag.encoding.is_none()
    }

    fn apply(&self, input: &[u8], _tag: &CacheTag) -> FilterOutcome {
        let document = match std::str::from_utf8(input) {
            Ok(text) => text,
            Err(e) => return FilterOutcome::Fatal(MediaError::BadData(e.to_string())),
        };
        match minify(document) {
            Ok(minified) => FilterOutcome::Produced(minified.into_bytes()),
            Err(e) => FilterOutcome::Fatal(e),
        }
    }
}
