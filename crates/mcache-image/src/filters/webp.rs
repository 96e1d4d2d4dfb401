//! Lossless WebP variant.

use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use mcache_core::{CacheTag, MediaType};

use super::decode;
use crate::filter::{FilterOutcome, ImageFilter};

/// Converts raster input to lossless WebP.
///
/// GIF input is unhandlable (animation would be lost), as is any result that
/// is not smaller than its input: a larger "modern" variant would only cost
/// bandwidth.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpFilter;

impl ImageFilter for WebpFilter {
    fn accepts(&self, tag: &CacheTag) -> bool {
        tag.format == Some(MediaType::Webp)
    }

    fn apply(&self, input: &[u8], _tag: &CacheTag) -> FilterOutcome {
        let (image, source) = match decode(input) {
            Ok(decoded) => decoded,
            Err(outcome) => return outcome,
        };
        if source == ImageFormat::Gif {
            return FilterOutcome::Unhandlable("GIF is not converted to WebP".into());
        }

        let image = if image.color().has_alpha() {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };
        let mut output = Vec::new();
        if let Err(e) = image.write_with_encoder(WebPEncoder::new_lossless(&mut output)) {
            return FilterOutcome::Unhandlable(e.to_string());
        }

        if output.len() >= input.len() {
            return FilterOutcome::Unhandlable(format!(
                "WebP is not smaller ({} >= {} bytes)",
                output.len(),
                input.len()
            ));
        }
        FilterOutcome::Produced(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::fixtures;

    fn webp_tag() -> CacheTag {
        CacheTag::format(MediaType::Webp)
    }

    #[test]
    fn accepts_webp_tag_only() {
        assert!(WebpFilter.accepts(&webp_tag()));
        assert!(!WebpFilter.accepts(&CacheTag::format(MediaType::Png)));
        assert!(!WebpFilter.accepts(&CacheTag::primary()));
    }

    #[test]
    fn uncompressed_input_converts() {
        let input = fixtures::encoded(&fixtures::rgb(64, 64), ImageFormat::Bmp);
        match WebpFilter.apply(&input, &webp_tag()) {
            FilterOutcome::Produced(out) => {
                assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::WebP);
                let decoded = image::load_from_memory(&out).unwrap();
                assert_eq!((decoded.width(), decoded.height()), (64, 64));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn alpha_is_preserved() {
        let input = fixtures::encoded(&fixtures::rgba(32, 32), ImageFormat::Bmp);
        match WebpFilter.apply(&input, &webp_tag()) {
            FilterOutcome::Produced(out) => {
                let decoded = image::load_from_memory(&out).unwrap();
                assert!(decoded.color().has_alpha());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn gif_is_unhandlable() {
        let input = fixtures::encoded(&fixtures::rgba(8, 8), ImageFormat::Gif);
        assert!(matches!(
            WebpFilter.apply(&input, &webp_tag()),
            FilterOutcome::Unhandlable(_)
        ));
    }

    #[test]
    fn undecodable_input_is_fatal() {
        assert!(matches!(
            WebpFilter.apply(b"not an image at all", &webp_tag()),
            FilterOutcome::Fatal(_)
        ));
    }
}
