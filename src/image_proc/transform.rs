//! Preview sizing.
//!
//! The simulation runs synchronously over every pixel, so sources are
//! brought down to a fixed preview width first.

use super::bitmap::Bitmap;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Width the dashboard preview works at
pub const DEFAULT_PREVIEW_WIDTH: u32 = 800;

/// Preview sizing options
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Scale to `target_width` (keeping aspect ratio) before simulating
    pub resize: bool,
    /// Target preview width
    pub target_width: u32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            resize: true,
            target_width: DEFAULT_PREVIEW_WIDTH,
        }
    }
}

/// Height matching `target_width` for a source of the given size, rounded
/// to the nearest pixel
pub fn preview_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    if src_width == 0 {
        return 0;
    }
    let aspect = src_height as f64 / src_width as f64;
    (target_width as f64 * aspect).round() as u32
}

/// Prepare a decoded image for simulation
pub fn transform_image(img: DynamicImage, options: &TransformOptions) -> Bitmap {
    let img = if options.resize {
        scale_to_width(img, options.target_width)
    } else {
        img
    };

    Bitmap::from(img.into_rgba8())
}

/// Scale image to the given width, keeping aspect ratio
fn scale_to_width(img: DynamicImage, target_width: u32) -> DynamicImage {
    let (src_width, src_height) = img.dimensions();
    let target_height = preview_height(src_width, src_height, target_width);

    if (src_width, src_height) == (target_width, target_height) || target_height == 0 {
        return img;
    }

    tracing::debug!(
        "Scaling {}x{} -> {}x{}",
        src_width,
        src_height,
        target_width,
        target_height
    );

    img.resize_exact(target_width, target_height, FilterType::Triangle)
}
