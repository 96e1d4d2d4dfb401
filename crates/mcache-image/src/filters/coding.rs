//! Same-type re-encode.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use mcache_core::{CacheTag, MediaType};

use super::decode;
use crate::filter::{FilterOutcome, ImageFilter};

/// Re-encodes an image into the tag's own type with size-oriented settings.
///
/// The smaller of the re-encode and the input wins, so the variant is never
/// larger than the original. GIF is passed through: re-encoding would drop
/// animation frames.
#[derive(Debug, Clone)]
pub struct CodingFilter {
    jpeg_quality: u8,
}

impl Default for CodingFilter {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

impl CodingFilter {
    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
        }
    }
}

impl ImageFilter for CodingFilter {
    fn accepts(&self, tag: &CacheTag) -> bool {
        matches!(
            tag.format,
            Some(MediaType::Jpg | MediaType::Png | MediaType::Gif)
        )
    }

    fn apply(&self, input: &[u8], tag: &CacheTag) -> FilterOutcome {
        let target = match tag.format {
            Some(MediaType::Gif) => return FilterOutcome::Produced(input.to_vec()),
            Some(target) => target,
            None => return FilterOutcome::Unhandlable("tag has no format".into()),
        };
        let (image, _) = match decode(input) {
            Ok(decoded) => decoded,
            Err(outcome) => return outcome,
        };

        let mut output = Vec::new();
        let encoded = match target {
            MediaType::Jpg => {
                let rgb = image.to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut output, self.jpeg_quality);
                rgb.write_with_encoder(encoder).map_err(|e| e.to_string())
            }
            MediaType::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut output,
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                image.write_with_encoder(encoder).map_err(|e| e.to_string())
            }
            other => Err(format!("cannot re-encode to {other}")),
        };
        if let Err(reason) = encoded {
            return FilterOutcome::Unhandlable(reason);
        }

        if output.len() < input.len() {
            FilterOutcome::Produced(output)
        } else {
            FilterOutcome::Produced(input.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::fixtures;
    use image::ImageFormat;

    #[test]
    fn accepts_traditional_formats_only() {
        let filter = CodingFilter::default();
        assert!(filter.accepts(&CacheTag::format(MediaType::Jpg)));
        assert!(filter.accepts(&CacheTag::format(MediaType::Png)));
        assert!(filter.accepts(&CacheTag::format(MediaType::Gif)));
        assert!(!filter.accepts(&CacheTag::format(MediaType::Webp)));
        assert!(!filter.accepts(&CacheTag::primary()));
    }

    #[test]
    fn png_reencode_is_never_larger() {
        let input = fixtures::encoded(&fixtures::rgb(64, 64), ImageFormat::Png);
        match CodingFilter::default().apply(&input, &CacheTag::format(MediaType::Png)) {
            FilterOutcome::Produced(out) => {
                assert!(out.len() <= input.len());
                assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn jpeg_reencode_decodes() {
        let input = fixtures::encoded(&fixtures::rgb(48, 32), ImageFormat::Jpeg);
        match CodingFilter::default().apply(&input, &CacheTag::format(MediaType::Jpg)) {
            FilterOutcome::Produced(out) => {
                let decoded = image::load_from_memory(&out).unwrap();
                assert_eq!((decoded.width(), decoded.height()), (48, 32));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn gif_passes_through() {
        let input = fixtures::encoded(&fixtures::rgba(8, 8), ImageFormat::Gif);
        match CodingFilter::default().apply(&input, &CacheTag::format(MediaType::Gif)) {
            FilterOutcome::Produced(out) => assert_eq!(out, input),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn corrupt_input_is_fatal() {
        let outcome = CodingFilter::default()
            .apply(b"\x89PNG\r\n\x1a\ngarbage", &CacheTag::format(MediaType::Png));
        assert!(matches!(outcome, FilterOutcome::Fatal(_)));
    }
}
