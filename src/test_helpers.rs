//! Shared test utilities: small synthetic images encoded in memory.
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let opaque = png_bytes(200, 150);
//! let clear = transparent_png_bytes(8, 8);
//! ```

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// An opaque gradient PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    encode_png(&image::DynamicImage::ImageRgb8(img))
}

/// A PNG whose every pixel is fully transparent black.
pub fn transparent_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    encode_png(&image::DynamicImage::ImageRgba8(img))
}

fn encode_png(img: &image::DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
