//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [conversion engine](crate::convert) (which decides
//! the output size, format and background) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing conversion logic.
//!
//! ## Types
//!
//! - [`Quality`]: Normalized encoding quality (0.0–1.0, default 0.9). Clamped on construction.
//! - [`Rgb`]: An opaque background color used to flatten transparency.
//! - [`RasterizeParams`]: Full specification for one rasterize + encode pass.

use crate::format::OutputFormat;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding, normalized to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    /// Clamp `value` into `0.0..=1.0`. NaN becomes the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality as a 1–100 percentage, the scale lossy encoders expect.
    /// Only the JPEG encoder reads it: WebP is encoded lossless and PNG, BMP,
    /// TIFF and ICO have no quality setting.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.9)
    }
}

impl TryFrom<f32> for Quality {
    type Error = String;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("quality must be between 0.0 and 1.0, got {value}"))
        }
    }
}

impl From<Quality> for f32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
}

/// Parameters for a rasterize-and-encode pass over one decoded bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizeParams {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
    /// Pre-fill the surface with this color before drawing.
    pub background: Option<Rgb>,
}
