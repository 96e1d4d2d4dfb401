//! # Cache Tags
//!
//! A `CacheTag` identifies one stored file of a slot: an optional target
//! format and an optional target encoding. The empty tag is the primary
//! artifact itself.
//!
//! The tag-to-suffix mapping is fixed and is the only thing that makes the
//! store index-free:
//!
//! | Tag                      | Suffix appended to `<hash>.<type>` |
//! |--------------------------|------------------------------------|
//! | primary                  | (none)                             |
//! | format `F`               | `.F`                               |
//! | encoding brotli          | `.br`                              |
//! | encoding gzip            | `.gz`                              |

use serde::{Deserialize, Serialize};

use crate::media::MediaType;

/// A content encoding applied on top of a physical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Brotli,
    Gzip,
}

impl Encoding {
    /// File extension appended to the encoded file, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gz",
        }
    }

    /// Value of the `Content-Encoding` response header.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Brotli => "brotli",
            Self::Gzip => "gzip",
        })
    }
}

/// Identifies one variant of a slot. Structurally comparable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheTag {
    pub format: Option<MediaType>,
    pub encoding: Option<Encoding>,
}

impl CacheTag {
    /// The empty tag: identity format, identity encoding.
    pub fn primary() -> Self {
        Self::default()
    }

    pub fn format(format: MediaType) -> Self {
        Self {
            format: Some(format),
            encoding: None,
        }
    }

    pub fn encoded(encoding: Encoding) -> Self {
        Self {
            format: None,
            encoding: Some(encoding),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn is_primary(&self) -> bool {
        self.format.is_none() && self.encoding.is_none()
    }

    /// The suffix appended to `<hash>.<type>` for this tag.
    pub fn suffix(&self) -> String {
        let mut suffix = String::new();
        if let Some(format) = self.format {
            suffix.push('.');
            suffix.push_str(format.as_str());
        }
        if let Some(encoding) = self.encoding {
            suffix.push('.');
            suffix.push_str(encoding.extension());
        }
        suffix
    }
}

impl std::fmt::Display for CacheTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.format, self.encoding) {
            (None, None) => f.write_str("primary"),
            (Some(format), None) => write!(f, "format={format}"),
            (None, Some(encoding)) => write!(f, "encoding={encoding}"),
            (Some(format), Some(encoding)) => write!(f, "format={format},encoding={encoding}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_has_empty_suffix() {
        assert!(CacheTag::primary().is_primary());
        assert_eq!(CacheTag::primary().suffix(), "");
    }

    #[test]
    fn suffix_mapping() {
        assert_eq!(CacheTag::format(MediaType::Webp).suffix(), ".webp");
        assert_eq!(CacheTag::encoded(Encoding::Brotli).suffix(), ".br");
        assert_eq!(CacheTag::encoded(Encoding::Gzip).suffix(), ".gz");
        assert_eq!(
            CacheTag::format(MediaType::Svg)
                .with_encoding(Encoding::Brotli)
                .suffix(),
            ".svg.br"
        );
    }

    #[test]
    fn tags_compare_structurally() {
        assert_eq!(CacheTag::format(MediaType::Webp), CacheTag::format(MediaType::Webp));
        assert_ne!(CacheTag::format(MediaType::Webp), CacheTag::format(MediaType::Png));
        assert_ne!(CacheTag::primary(), CacheTag::encoded(Encoding::Gzip));
    }

    #[test]
    fn content_encoding_header_values() {
        assert_eq!(Encoding::Brotli.content_encoding(), "br");
        assert_eq!(Encoding::Gzip.content_encoding(), "gzip");
    }

    #[test]
    fn display() {
        assert_eq!(CacheTag::primary().to_string(), "primary");
        assert_eq!(
            CacheTag::format(MediaType::Webp).to_string(),
            "format=webp"
        );
    }
}
