//! Output encodings for a simulated preview.
//!
//! A preview is either written as a PNG for display on screen, or packed
//! into the 4-bit-per-pixel buffer the EPD7IN3E controller expects.

use super::bitmap::Bitmap;
use super::dither::SimulationError;
use super::palette::Color;
use super::ProcessingError;
use image::{ImageFormat, RgbaImage};
use std::path::Path;

/// Calculate packed buffer size for given dimensions (2 pixels per byte)
pub fn calculate_buffer_size(width: u32, height: u32) -> usize {
    (width as usize * height as usize).div_ceil(2)
}

/// Pack a simulated bitmap into panel color codes, two pixels per byte.
///
/// The first pixel of each pair goes into the high nibble. Every pixel must
/// be an exact palette color.
pub fn pack_4bpp(bitmap: &Bitmap) -> Result<Vec<u8>, SimulationError> {
    let (width, height) = bitmap.dimensions();
    let mut result = vec![0u8; calculate_buffer_size(width, height)];

    for (i, px) in bitmap.pixels().chunks_exact(4).enumerate() {
        let color = Color::from_rgb(px[0], px[1], px[2]).ok_or_else(|| {
            SimulationError::NotPaletteColor {
                x: (i % width as usize) as u32,
                y: (i / width as usize) as u32,
            }
        })?;

        let code = color.panel_code();
        if i % 2 == 0 {
            result[i / 2] = code << 4;
        } else {
            result[i / 2] |= code;
        }
    }

    tracing::debug!("Packed preview, output size: {} bytes", result.len());
    Ok(result)
}

/// Write a bitmap as PNG
pub fn save_png<P: AsRef<Path>>(bitmap: Bitmap, path: P) -> Result<(), ProcessingError> {
    let img = RgbaImage::try_from(bitmap)?;
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
