//! # Resize Specification
//!
//! Parses the `<width>x<height>` argument of the resize filter. Either side
//! may be omitted to leave that dimension unconstrained (`800x`, `x600`),
//! but not both.

use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// A bounding box for downscaling. `None` leaves that axis unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeSpec {
    /// Parse `WxH`, `Wx` or `xH`.
    pub fn parse(arg: &str) -> Result<Self, MediaError> {
        let (w, h) = arg
            .trim()
            .split_once('x')
            .ok_or_else(|| MediaError::FilterArgument(format!("resize spec {arg:?} is not WxH")))?;
        let width = parse_side(w, arg)?;
        let height = parse_side(h, arg)?;
        if width.is_none() && height.is_none() {
            return Err(MediaError::FilterArgument(format!(
                "resize spec {arg:?} constrains neither side"
            )));
        }
        Ok(Self { width, height })
    }

    /// Target dimensions for an image of `(width, height)`, preserving the
    /// aspect ratio. Returns `None` when the image already fits.
    pub fn fit(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let max_w = self.width.unwrap_or(u32::MAX);
        let max_h = self.height.unwrap_or(u32::MAX);
        if width <= max_w && height <= max_h {
            return None;
        }
        let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
        let w = ((width as f64 * scale).round() as u32).max(1);
        let h = ((height as f64 * scale).round() as u32).max(1);
        Some((w, h))
    }
}

fn parse_side(side: &str, arg: &str) -> Result<Option<u32>, MediaError> {
    if side.is_empty() {
        return Ok(None);
    }
    if !side.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MediaError::FilterArgument(format!(
            "resize spec {arg:?} has a non-numeric side"
        )));
    }
    match side.parse::<u32>() {
        Ok(0) | Err(_) => Err(MediaError::FilterArgument(format!(
            "resize spec {arg:?} side must be a positive integer"
        ))),
        Ok(n) => Ok(Some(n)),
    }
}

impl std::fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(w) = self.width {
            write!(f, "{w}")?;
        }
        f.write_str("x")?;
        if let Some(h) = self.height {
            write!(f, "{h}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_sides() {
        let spec = ResizeSpec::parse("800x600").unwrap();
        assert_eq!(spec.width, Some(800));
        assert_eq!(spec.height, Some(600));
    }

    #[test]
    fn parses_single_side() {
        assert_eq!(ResizeSpec::parse("800x").unwrap().height, None);
        assert_eq!(ResizeSpec::parse("x600").unwrap().width, None);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "x", "800", "axb", "-1x2", "0x10", "+5x"] {
            let err = ResizeSpec::parse(bad).unwrap_err();
            assert!(matches!(err, MediaError::FilterArgument(_)), "{bad}");
        }
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        let spec = ResizeSpec::parse("100x").unwrap();
        assert_eq!(spec.fit(400, 200), Some((100, 50)));
        assert_eq!(spec.fit(50, 50), None);
    }

    #[test]
    fn display_roundtrips_text() {
        assert_eq!(ResizeSpec::parse("x600").unwrap().to_string(), "x600");
    }
}
