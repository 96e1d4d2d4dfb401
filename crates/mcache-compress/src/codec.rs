//! Brotli and gzip encoders over in-memory buffers.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::CompressError;

/// Quality used for offline compression. Assets are compressed once and
/// served many times, so the slowest setting is the right one.
pub const BROTLI_QUALITY: u32 = 11;

pub const GZIP_LEVEL: u32 = 9;

/// Brotli-compress `data` at `quality` (0-11, clamped).
pub fn brotli_compress(data: &[u8], quality: u32) -> Result<Vec<u8>, CompressError> {
    let mut output = Vec::with_capacity(data.len() / 2);
    let mut reader = std::io::Cursor::new(data);
    brotli::BrotliCompress(
        &mut reader,
        &mut output,
        &brotli::enc::BrotliEncoderParams {
            quality: quality.min(11) as i32,
            ..Default::default()
        },
    )
    .map_err(|e| CompressError::Codec {
        codec: "brotli",
        message: e.to_string(),
    })?;
    Ok(output)
}

/// Gzip-compress `data` at `level` (0-9, clamped).
pub fn gzip_compress(data: &[u8], level: u32) -> Result<Vec<u8>, CompressError> {
    let codec_error = |e: std::io::Error| CompressError::Codec {
        codec: "gzip",
        message: e.to_string(),
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data).map_err(codec_error)?;
    encoder.finish().map_err(codec_error)
}
