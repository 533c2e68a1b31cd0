//! Shared types passed between the registry, the engine and the
//! presentation layer.
//!
//! Records own their [`DisplayHandle`]s and are therefore move-only. The
//! presentation layer reads them by reference (or serialized, in which case
//! the handle becomes its URL and the payload is omitted).

use crate::format::OutputFormat;
use crate::handles::DisplayHandle;
use crate::imaging::{Dimensions, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Session-unique record identifier. Strictly increasing in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file handed over by the presentation layer (picker or drop).
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Declared media type, e.g. `image/png`.
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its media type from the extension.
    /// Unknown extensions are declared as `application/octet-stream`.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime_type = image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// An uploaded image awaiting conversion.
#[derive(Debug, Serialize)]
pub struct SourceRecord {
    pub id: RecordId,
    pub original_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub display_handle: DisplayHandle,
}

impl SourceRecord {
    /// Uppercased MIME subtype (`image/png` → `PNG`).
    pub fn type_label(&self) -> String {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or(&self.mime_type)
            .to_ascii_uppercase()
    }

    /// Whether this record and an upload refer to the same source.
    pub fn same_source(&self, name: &str, size_bytes: u64) -> bool {
        self.original_name == name && self.size_bytes == size_bytes
    }
}

/// One converted output.
#[derive(Debug, Serialize)]
pub struct ResultRecord {
    pub id: RecordId,
    /// Source this result was converted from.
    pub source_id: RecordId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: &'static str,
    pub format_label: String,
    pub output_dimensions: Dimensions,
    pub display_handle: DisplayHandle,
    #[serde(skip)]
    pub payload: Arc<[u8]>,
}

/// Parameters for one batch run, captured before the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub output_format: OutputFormat,
    pub quality: Quality,
    pub target_width: Option<NonZeroU32>,
    pub target_height: Option<NonZeroU32>,
    /// Only affects interactive width/height linkage, never the resolved size.
    pub maintain_aspect_ratio: bool,
}

impl ConversionConfig {
    pub fn new(output_format: OutputFormat) -> Self {
        Self {
            output_format,
            quality: Quality::default(),
            target_width: None,
            target_height: None,
            maintain_aspect_ratio: true,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Set target edges; zero means "not given".
    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.target_width = width.and_then(NonZeroU32::new);
        self.target_height = height.and_then(NonZeroU32::new);
        self
    }

    pub fn with_aspect_lock(mut self, maintain: bool) -> Self {
        self.maintain_aspect_ratio = maintain;
        self
    }
}
