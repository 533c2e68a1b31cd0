//! Image processing: pure Rust, on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image::load_from_memory` |
//! | **Rasterize** | Lanczos3 `resize_exact` + optional white flatten |
//! | **Encode** | JPEG (quality-aware), PNG, WebP, BMP, TIFF, ICO |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing one rasterize pass
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Decoded, Dimensions, ImageBackend};
pub use calculations::{height_for_width, resolve_dimensions, width_for_height};
pub use params::{Quality, RasterizeParams, Rgb};
pub use rust_backend::RustBackend;
