//! Full-screen capture.
//!
//! This module provides:
//! - Pixel conversion from GDI's BGRA rows (`bgra_to_rgba`)
//! - The Windows GDI screen grabber (`GdiScreenCapture`)

use anyhow::{anyhow, Result};
use image::RgbaImage;

#[cfg(windows)]
pub mod screen;

#[cfg(windows)]
pub use screen::{enable_dpi_awareness, GdiScreenCapture};

/// Converts tightly packed top-down BGRA pixels into an RGBA image.
///
/// GDI leaves the alpha byte of screen DIBs undefined, so it is forced opaque.
pub fn bgra_to_rgba(width: u32, height: u32, mut pixels: Vec<u8>) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(anyhow!(
            "Pixel buffer size mismatch: got {} bytes, expected {}",
            pixels.len(),
            expected
        ));
    }

    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
        px[3] = 255;
    }

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("Failed to build {}x{} image", width, height))
}
