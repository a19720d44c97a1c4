//! Library texture to PNG conversion.

use std::path::Path;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgba, RgbaImage};

/// Convert one packed RGB pixel to RGBA. Pure black is the libraries'
/// transparent color key; everything else is fully opaque.
pub fn rgb_to_rgba([r, g, b]: [u8; 3]) -> [u8; 4] {
    let a = if r == 0 && g == 0 && b == 0 { 0 } else { 255 };
    [r, g, b, a]
}

/// Build an RGBA image from packed RGB data (3 bytes per pixel, row-major).
pub fn rgb_to_image(width: u32, height: u32, rgb: &[u8]) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        anyhow::bail!(
            "RGB buffer for {}x{} image has {} bytes, expected {}",
            width,
            height,
            rgb.len(),
            expected
        );
    }

    let mut img = RgbaImage::new(width, height);
    for (pixel, src) in img.pixels_mut().zip(rgb.chunks_exact(3)) {
        *pixel = Rgba(rgb_to_rgba([src[0], src[1], src[2]]));
    }
    Ok(img)
}

/// The 1×1 opaque black image standing in for empty library entries.
pub fn placeholder_image() -> RgbaImage {
    RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]))
}

pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write PNG: {}", path.display()))
}
