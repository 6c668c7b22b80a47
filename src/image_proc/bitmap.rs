//! RGBA8888 bitmap shared by the simulation core and the I/O layer.

use super::dither::SimulationError;
use image::RgbaImage;

/// Row-major RGBA8888 pixel buffer.
///
/// The length invariant (`4 * width * height`) is checked on construction,
/// so every `Bitmap` reaching the simulation is well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Byte length of an RGBA buffer, or `None` if it does not fit in memory
pub fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
}

impl Bitmap {
    /// Wrap an RGBA buffer, rejecting a length that does not match the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SimulationError> {
        match rgba_len(width, height) {
            Some(expected) if expected == pixels.len() => Ok(Self {
                width,
                height,
                pixels,
            }),
            _ => Err(SimulationError::InvalidDimensions {
                width,
                height,
                len: pixels.len(),
            }),
        }
    }

    /// Bitmap filled with a single RGBA value
    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, SimulationError> {
        let len = rgba_len(width, height).ok_or(SimulationError::InvalidDimensions {
            width,
            height,
            len: 0,
        })?;
        let pixels = rgba.iter().copied().cycle().take(len).collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA value at (x, y), or `None` outside the bitmap
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }
}

impl TryFrom<Bitmap> for RgbaImage {
    type Error = SimulationError;

    fn try_from(bitmap: Bitmap) -> Result<Self, Self::Error> {
        let (width, height) = bitmap.dimensions();
        let len = bitmap.pixels.len();
        RgbaImage::from_raw(width, height, bitmap.pixels)
            .ok_or(SimulationError::InvalidDimensions { width, height, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(Bitmap::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            Bitmap::new(2, 2, vec![0; 15]),
            Err(SimulationError::InvalidDimensions { width: 2, height: 2, len: 15 })
        ));
        assert!(Bitmap::new(0, 5, Vec::new()).is_ok());
    }

    #[test]
    fn test_absurd_dimensions() {
        assert!(Bitmap::new(u32::MAX, u32::MAX, vec![0; 4]).is_err());
    }

    #[test]
    fn test_pixel_access() {
        let bitmap = Bitmap::from_pixel(3, 2, [1, 2, 3, 4]).unwrap();
        assert_eq!(bitmap.pixels().len(), 24);
        assert_eq!(bitmap.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(bitmap.pixel(3, 0), None);
    }

    #[test]
    fn test_rgba_image_conversion() {
        let img = RgbaImage::from_pixel(4, 3, image::Rgba([9, 8, 7, 6]));
        let bitmap = Bitmap::from(img.clone());
        assert_eq!(bitmap.dimensions(), (4, 3));
        assert_eq!(RgbaImage::try_from(bitmap).unwrap(), img);
    }

    #[test]
    fn test_malformed_buffer_is_not_converted() {
        // Only reachable by bypassing `Bitmap::new`
        let bitmap = Bitmap {
            width: 2,
            height: 2,
            pixels: vec![0; 3],
        };
        assert_eq!(
            RgbaImage::try_from(bitmap),
            Err(SimulationError::InvalidDimensions { width: 2, height: 2, len: 3 })
        );
    }
}
