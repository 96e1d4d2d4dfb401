//! # Media Types and Artifact Identity
//!
//! `MediaType` is the normalized type token carried in every physical file
//! name (`jpg`, `png`, `gif`, `svg`, ...). `Identity` pairs it with the
//! content digest and is the dedup key for stored media.
//!
//! Declared types arrive either as bare tokens (`jpeg`, `PNG`) or as MIME
//! types (`image/svg+xml`); both forms normalize to the same token.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::MediaError;
use crate::tag::CacheTag;

/// A normalized media type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Jpg,
    Png,
    Gif,
    Bmp,
    Svg,
    Webp,
    Avif,
}

impl MediaType {
    /// Types accepted by `save`. WebP and AVIF are output-only: there is no
    /// lossless way back from them to the traditional formats.
    pub const INPUT_FORMATS: [MediaType; 5] = [
        MediaType::Jpg,
        MediaType::Png,
        MediaType::Gif,
        MediaType::Bmp,
        MediaType::Svg,
    ];

    /// The file extension / type token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Svg => "svg",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    /// The canonical MIME type.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Svg => "image/svg+xml",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// Whether this type is on the input allow-list.
    pub fn is_input(&self) -> bool {
        Self::INPUT_FORMATS.contains(self)
    }

    /// Whether this is a vector format (optimized and brotli-encoded rather
    /// than re-encoded).
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Normalize a declared type: a bare token or a MIME type.
    ///
    /// Parameters after `;` are ignored (`image/png; charset=binary`).
    pub fn from_declared(declared: &str) -> Result<Self, MediaError> {
        let lowered = declared.trim().to_ascii_lowercase();
        let essence = lowered.split(';').next().unwrap_or("").trim();
        let token = essence.strip_prefix("image/").unwrap_or(essence);
        match token {
            "jpg" | "jpeg" | "pjpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "bmp" | "x-ms-bmp" => Ok(Self::Bmp),
            "svg" | "svg+xml" => Ok(Self::Svg),
            "webp" => Ok(Self::Webp),
            "avif" => Ok(Self::Avif),
            "" => Err(MediaError::UnsupportedFormat("empty media type".into())),
            other => Err(MediaError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_declared(s)
    }
}

/// The identity of a stored artifact: content digest plus normalized type.
///
/// Rendered as `<hash>.<type>`, which is also the primary artifact's file
/// name and the public name returned by `save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub digest: ContentDigest,
    pub media_type: MediaType,
}

impl Identity {
    pub fn new(digest: ContentDigest, media_type: MediaType) -> Self {
        Self { digest, media_type }
    }

    /// Physical file name for one cache tag of this identity.
    ///
    /// `<hash>.<type>` for the primary, `<hash>.<type>.<format>` for format
    /// variants, with `.br` / `.gz` appended for encoded variants.
    pub fn file_name(&self, tag: &CacheTag) -> String {
        format!("{}{}", self, tag.suffix())
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.digest.to_hex(), self.media_type)
    }
}

impl FromStr for Identity {
    type Err = MediaError;

    /// Parse `<64 hex>.<type>`. Only canonical names are accepted: lowercase
    /// hex and the canonical type token, so `<hash>.jpeg` and `<hash>.PNG`
    /// are rejected. A name like `<hash>.png.webp` is a physical variant
    /// file, not an identity.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, token) = s
            .split_once('.')
            .ok_or_else(|| MediaError::InvalidIdentity(format!("missing type in {s:?}")))?;
        if token.contains('.') || token.contains('/') {
            return Err(MediaError::InvalidIdentity(format!(
                "unexpected suffix in {s:?}"
            )));
        }
        let digest = ContentDigest::from_hex(hash)?;
        let media_type = MediaType::from_declared(token)
            .map_err(|_| MediaError::InvalidIdentity(format!("unknown type {token:?}")))?;
        let identity = Self { digest, media_type };
        if identity.to_string() != s {
            return Err(MediaError::InvalidIdentity(format!(
                "non-canonical name {s:?}"
            )));
        }
        Ok(identity)
    }
}
