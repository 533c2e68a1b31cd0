//! Output formats, MIME types and output filenames.
//!
//! [`OutputFormat`] is the closed set of formats a batch can target. Parsing
//! rejects anything outside it, so configuration typos surface when the
//! config is built rather than mid-batch.
//!
//! The string-level helpers [`mime_for`] and [`derive_name`] work on raw
//! format tags and never fail: an unknown tag maps to the PNG MIME type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MIME type used when a format tag is not recognized.
pub const FALLBACK_MIME: &str = "image/png";

/// A target format for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Bmp,
    Tiff,
    Ico,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Bmp,
        OutputFormat::Tiff,
        OutputFormat::Ico,
    ];

    /// Lowercase tag, also used as the output file extension.
    pub fn tag(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Ico => "ico",
        }
    }

    /// Uppercased tag shown next to results (`"JPEG"`).
    pub fn label(self) -> String {
        self.tag().to_ascii_uppercase()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Tiff => "image/tiff",
            OutputFormat::Ico => "image/x-icon",
        }
    }

    /// Whether encoded output can carry transparency. Formats without it get
    /// an opaque white background before drawing.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output format '{0}' (expected one of jpeg, png, webp, bmp, tiff, ico)")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.tag() == lower)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// MIME type for a format tag. Unknown tags fall back to [`FALLBACK_MIME`].
pub fn mime_for(format: &str) -> &'static str {
    format
        .parse::<OutputFormat>()
        .map(OutputFormat::mime_type)
        .unwrap_or(FALLBACK_MIME)
}

/// Output filename: `original` with its extension (from the last `.` to the
/// end) replaced by `.{format}`. Names without a `.` keep every character.
///
/// - `"photo.tiff"`, `"png"` → `"photo.png"`
/// - `"archive.tar.gz"`, `"webp"` → `"archive.tar.webp"`
/// - `"noext"`, `"png"` → `"noext.png"`
pub fn derive_name(original: &str, format: &str) -> String {
    let stem = match original.rfind('.') {
        Some(dot) => &original[..dot],
        None => original,
    };
    format!("{stem}.{format}")
}
