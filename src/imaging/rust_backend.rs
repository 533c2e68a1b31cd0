//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary. CPU-bound work runs on
//! tokio's blocking pool so the caller only suspends at decode and encode.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, WebP, BMP, TIFF, ICO) | `image::load_from_memory` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Background fill | `imageops::overlay` onto an opaque canvas |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality-aware) |
//! | Encode → PNG, WebP, BMP, TIFF, ICO | `DynamicImage::write_to` (lossless, quality ignored) |
//!
//! The WebP encoder in the `image` crate is lossless only. ICO output is
//! limited to 256×256 by the format; larger surfaces fail to encode.
//!
//! Surfaces larger than the allocation limit (by default the `image` crate's
//! own decode limit, 512 MiB) are refused before any pixel buffer is
//! allocated, so an oversized target fails that one item.

use super::backend::{BackendError, Decoded, Dimensions, ImageBackend};
use super::params::{RasterizeParams, Rgb};
use crate::format::OutputFormat;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// Fallback when `image::Limits` carries no allocation limit.
const DEFAULT_MAX_SURFACE_BYTES: u64 = 512 * 1024 * 1024;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy)]
pub struct RustBackend {
    max_surface_bytes: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            max_surface_bytes: image::Limits::default()
                .max_alloc
                .unwrap_or(DEFAULT_MAX_SURFACE_BYTES),
        }
    }

    /// Refuse RGBA surfaces larger than `bytes`.
    pub fn with_max_surface_bytes(mut self, bytes: u64) -> Self {
        self.max_surface_bytes = bytes;
        self
    }

    pub fn max_surface_bytes(&self) -> u64 {
        self.max_surface_bytes
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a CPU-bound closure on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, BackendError>
where
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BackendError::Task(e.to_string()))?
}

/// Bytes of one RGBA8 surface of the target size.
fn surface_bytes(params: &RasterizeParams) -> u64 {
    u64::from(params.width) * u64::from(params.height) * 4
}

fn identify_bytes(bytes: &[u8]) -> Result<Dimensions, BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("Failed to read header: {e}")))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
    Ok(Dimensions { width, height })
}

fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(bytes).map_err(|e| BackendError::Decode(format!("{e}")))
}

/// Scale `img` to the target size and flatten it onto `background` if set.
fn draw(img: DynamicImage, params: &RasterizeParams) -> DynamicImage {
    let scaled = if (img.width(), img.height()) == (params.width, params.height) {
        img
    } else {
        img.resize_exact(params.width, params.height, FilterType::Lanczos3)
    };

    match params.background {
        Some(Rgb([r, g, b])) => {
            let mut canvas = RgbaImage::from_pixel(params.width, params.height, Rgba([r, g, b, 255]));
            image::imageops::overlay(&mut canvas, &scaled.to_rgba8(), 0, 0);
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
        }
        None => DynamicImage::ImageRgba8(scaled.to_rgba8()),
    }
}

/// Encode a drawn surface in the requested format.
fn encode(surface: &DynamicImage, params: &RasterizeParams) -> Result<Vec<u8>, BackendError> {
    let mut out = Cursor::new(Vec::new());
    let result = match params.format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, params.quality.percent());
            // JPEG has no alpha channel; drop it if the caller skipped the fill.
            DynamicImage::ImageRgb8(surface.to_rgb8()).write_with_encoder(encoder)
        }
        OutputFormat::Png => surface.write_to(&mut out, ImageFormat::Png),
        OutputFormat::Webp => surface.write_to(&mut out, ImageFormat::WebP),
        OutputFormat::Bmp => surface.write_to(&mut out, ImageFormat::Bmp),
        OutputFormat::Tiff => surface.write_to(&mut out, ImageFormat::Tiff),
        OutputFormat::Ico => surface.write_to(&mut out, ImageFormat::Ico),
    };
    result.map_err(|e| BackendError::Encode(format!("{} encode failed: {e}", params.format.label())))?;
    Ok(out.into_inner())
}

#[async_trait]
impl ImageBackend for RustBackend {
    type Bitmap = DynamicImage;

    async fn identify(&self, bytes: Arc<[u8]>) -> Result<Dimensions, BackendError> {
        blocking(move || identify_bytes(&bytes)).await
    }

    async fn decode(&self, bytes: Arc<[u8]>) -> Result<Decoded<DynamicImage>, BackendError> {
        blocking(move || {
            let bitmap = decode_bytes(&bytes)?;
            let dimensions = Dimensions::new(bitmap.width(), bitmap.height());
            Ok(Decoded { bitmap, dimensions })
        })
        .await
    }

    async fn rasterize(
        &self,
        bitmap: DynamicImage,
        params: &RasterizeParams,
    ) -> Result<Vec<u8>, BackendError> {
        let needed = surface_bytes(params);
        if needed > self.max_surface_bytes {
            return Err(BackendError::Encode(format!(
                "surface too large: {}x{} needs {needed} bytes, limit is {}",
                params.width, params.height, self.max_surface_bytes
            )));
        }
        let params = params.clone();
        blocking(move || {
            let surface = draw(bitmap, &params);
            encode(&surface, &params)
        })
        .await
    }
}
