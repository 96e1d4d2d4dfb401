//! Downscaling to a bounding box.

use image::imageops::FilterType;
use image::ImageFormat;
use mcache_core::{CacheTag, ResizeSpec};

use super::{decode, encode};
use crate::filter::{FilterOutcome, ImageFilter};

/// Shrinks raster images to fit a [`ResizeSpec`], keeping the aspect ratio
/// and the source container. Images that already fit, and GIFs, pass
/// through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct ResizeFilter {
    spec: ResizeSpec,
}

impl ResizeFilter {
    pub fn new(spec: ResizeSpec) -> Self {
        Self { spec }
    }
}

impl ImageFilter for ResizeFilter {
    fn accepts(&self, tag: &CacheTag) -> bool {
        tag.format.is_some_and(|f| !f.is_vector())
    }

    fn apply(&self, input: &[u8], _tag: &CacheTag) -> FilterOutcome {
        let (image, format) = match decode(input) {
            Ok(decoded) => decoded,
            Err(outcome) => return outcome,
        };
        if format == ImageFormat::Gif {
            return FilterOutcome::Produced(input.to_vec());
        }
        let Some((width, height)) = self.spec.fit(image.width(), image.height()) else {
            return FilterOutcome::Produced(input.to_vec());
        };

        let resized = image.resize_exact(width, height, FilterType::Lanczos3);
        match encode(&resized, format) {
            Ok(out) => FilterOutcome::Produced(out),
            Err(reason) => FilterOutcome::Unhandlable(reason),
        }
    }
}
