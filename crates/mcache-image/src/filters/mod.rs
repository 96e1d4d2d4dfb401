//! Built-in raster filters: `coding`, `webp` and `resize`.

mod coding;
mod resize;
mod webp;

pub use coding::CodingFilter;
pub use resize::ResizeFilter;
pub use webp::WebpFilter;

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use mcache_core::{MediaError, MediaType};

use crate::filter::FilterOutcome;

/// The codec format for a raster media type.
pub(crate) fn image_format(media_type: MediaType) -> Option<ImageFormat> {
    match media_type {
        MediaType::Jpg => Some(ImageFormat::Jpeg),
        MediaType::Png => Some(ImageFormat::Png),
        MediaType::Gif => Some(ImageFormat::Gif),
        MediaType::Bmp => Some(ImageFormat::Bmp),
        MediaType::Webp => Some(ImageFormat::WebP),
        MediaType::Avif => Some(ImageFormat::Avif),
        MediaType::Svg => None,
    }
}

/// Decode `input`, reporting undecodable data as fatal.
pub(crate) fn decode(input: &[u8]) -> Result<(DynamicImage, ImageFormat), FilterOutcome> {
    let format = image::guess_format(input)
        .map_err(|e| FilterOutcome::Fatal(MediaError::BadData(e.to_string())))?;
    let image = image::load_from_memory_with_format(input, format)
        .map_err(|e| FilterOutcome::Fatal(MediaError::BadData(e.to_string())))?;
    Ok((image, format))
}

/// Encode with the crate's default encoder for `format`. JPEG has no alpha
/// channel, so images are flattened to RGB first.
pub(crate) fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let result = if format == ImageFormat::Jpeg && image.color().has_alpha() {
        DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut Cursor::new(&mut buffer), format)
    } else {
        image.write_to(&mut Cursor::new(&mut buffer), format)
    };
    result.map_err(|e| e.to_string())?;
    Ok(buffer)
}
