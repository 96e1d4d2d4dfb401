//! # Input Validation and Normalization
//!
//! Runs before hashing. The declared type must be on the input allow-list
//! and the bytes must actually be that type. Bitmaps are converted to PNG
//! here, so the content identity is computed on the canonical container.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use mcache_core::{MediaError, MediaType};

use crate::filters::image_format;
use crate::svg::looks_like_svg;

/// Validated, normalized input ready to be hashed and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    /// The normalized type. Never `Bmp`.
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
    /// Pixel dimensions for raster input.
    pub dimensions: Option<(u32, u32)>,
}

/// Normalize a declared type and check it against the input allow-list.
pub fn validate_declared(declared: &str) -> Result<MediaType, MediaError> {
    let media_type = MediaType::from_declared(declared)?;
    if !media_type.is_input() {
        return Err(MediaError::UnsupportedFormat(format!(
            "{media_type} is not accepted as input"
        )));
    }
    Ok(media_type)
}

/// Inspect `bytes` as `declared` and normalize the container.
pub fn prepare(bytes: Vec<u8>, declared: MediaType) -> Result<PreparedImage, MediaError> {
    if declared.is_vector() {
        if !looks_like_svg(&bytes) {
            return Err(MediaError::BadData("not an SVG document".into()));
        }
        return Ok(PreparedImage {
            media_type: MediaType::Svg,
            bytes,
            dimensions: None,
        });
    }

    let dimensions = read_dimensions(&bytes, declared)?;
    if declared == MediaType::Bmp {
        return Ok(PreparedImage {
            media_type: MediaType::Png,
            bytes: bmp_to_png(&bytes)?,
            dimensions: Some(dimensions),
        });
    }
    Ok(PreparedImage {
        media_type: declared,
        bytes,
        dimensions: Some(dimensions),
    })
}

/// Read the image header and check the sniffed container against the
/// declared type.
fn read_dimensions(bytes: &[u8], declared: MediaType) -> Result<(u32, u32), MediaError> {
    let expected = image_format(declared)
        .ok_or_else(|| MediaError::UnsupportedFormat(declared.to_string()))?;
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::BadData(e.to_string()))?;
    match reader.format() {
        Some(found) if found == expected => {}
        Some(found) => {
            return Err(MediaError::BadData(format!(
                "declared {declared} but content is {}",
                found.extensions_str().first().unwrap_or(&"unknown")
            )));
        }
        None => return Err(MediaError::BadData("unrecognized image content".into())),
    }
    reader
        .into_dimensions()
        .map_err(|e| MediaError::BadData(format!("cannot read {declared} header: {e}")))
}

fn bmp_to_png(bytes: &[u8]) -> Result<Vec<u8>, MediaError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Bmp)
        .map_err(|e| MediaError::BadData(format!("cannot decode bitmap: {e}")))?;
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| MediaError::BadData(format!("cannot convert bitmap: {e}")))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::fixtures;

    #[test]
    fn declared_allow_list() {
        assert_eq!(validate_declared("image/jpeg").unwrap(), MediaType::Jpg);
        assert_eq!(validate_declared("bmp").unwrap(), MediaType::Bmp);
        assert!(matches!(
            validate_declared("webp"),
            Err(MediaError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            validate_declared("image/tiff"),
            Err(MediaError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn png_dimensions_are_read() {
        let bytes = fixtures::encoded(&fixtures::rgb(30, 20), ImageFormat::Png);
        let prepared = prepare(bytes.clone(), MediaType::Png).unwrap();
        assert_eq!(prepared.media_type, MediaType::Png);
        assert_eq!(prepared.dimensions, Some((30, 20)));
        assert_eq!(prepared.bytes, bytes);
    }

    #[test]
    fn bmp_is_normalized_to_png() {
        let bytes = fixtures::encoded(&fixtures::rgb(16, 16), ImageFormat::Bmp);
        let prepared = prepare(bytes, MediaType::Bmp).unwrap();
        assert_eq!(prepared.media_type, MediaType::Png);
        assert_eq!(image::guess_format(&prepared.bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn bmp_normalization_is_deterministic() {
        let image = fixtures::rgb(12, 12);
        let a = prepare(fixtures::encoded(&image, ImageFormat::Bmp), MediaType::Bmp).unwrap();
        let b = prepare(fixtures::encoded(&image, ImageFormat::Bmp), MediaType::Bmp).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn mismatched_container_is_bad_data() {
        let bytes = fixtures::encoded(&fixtures::rgb(8, 8), ImageFormat::Png);
        assert!(matches!(
            prepare(bytes, MediaType::Jpg),
            Err(MediaError::BadData(_))
        ));
    }

    #[test]
    fn garbage_is_bad_data() {
        assert!(matches!(
            prepare(b"definitely not pixels".to_vec(), MediaType::Png),
            Err(MediaError::BadData(_))
        ));
    }

    #[test]
    fn truncated_header_is_bad_data() {
        let bytes = fixtures::encoded(&fixtures::rgb(8, 8), ImageFormat::Png);
        assert!(matches!(
            prepare(bytes[..12].to_vec(), MediaType::Png),
            Err(MediaError::BadData(_))
        ));
    }

    #[test]
    fn svg_requires_svg_root() {
        let ok = prepare(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec(), MediaType::Svg);
        assert_eq!(ok.unwrap().media_type, MediaType::Svg);
        assert!(matches!(
            prepare(b"<html/>".to_vec(), MediaType::Svg),
            Err(MediaError::BadData(_))
        ));
    }
}
