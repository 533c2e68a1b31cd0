//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the bitmap decode/encode surface the
//! conversion engine drives. It defines three asynchronous operations:
//! identify (header-only size read), decode, and rasterize (scale onto a
//! surface and re-encode).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on top of
//! the `image` crate. Decode and encode are the only suspension points of a
//! conversion.

use super::params::RasterizeParams;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Natural size of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// A decoded bitmap together with its natural size.
#[derive(Debug)]
pub struct Decoded<B> {
    pub bitmap: B,
    pub dimensions: Dimensions,
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the engine stays
/// backend-agnostic. Bitmaps are passed by value into
/// [`rasterize`](ImageBackend::rasterize): at most one decoded bitmap is in
/// flight per conversion.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Backend-specific decoded image.
    type Bitmap: Send + 'static;

    /// Read the natural size from the image header without a full decode.
    async fn identify(&self, bytes: Arc<[u8]>) -> Result<Dimensions, BackendError>;

    /// Decode raw bytes into a bitmap.
    async fn decode(&self, bytes: Arc<[u8]>) -> Result<Decoded<Self::Bitmap>, BackendError>;

    /// Draw `bitmap` scaled onto a `params.width × params.height` surface and
    /// encode it. An empty buffer is a valid return; the engine treats it as
    /// an encode failure.
    async fn rasterize(
        &self,
        bitmap: Self::Bitmap,
        params: &RasterizeParams,
    ) -> Result<Vec<u8>, BackendError>;
}
