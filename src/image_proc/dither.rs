//! E-ink display simulation: gamma, Floyd-Steinberg dithering to the
//! Spectra palette, and reassembly into an RGBA preview.
//!
//! The whole pipeline is a pure function of the input bitmap and the two
//! parameters. A single float working buffer is allocated per call and used
//! for both the gamma pass and the error diffusion scan.
//!
//! Channel values are stored as `f32` but every update is computed in `f64`
//! before being stored back, so results match a float32 accumulation buffer
//! updated with double-precision arithmetic.

use super::bitmap::Bitmap;
use super::palette::{nearest_color, Color};
use thiserror::Error;

/// Default gamma applied before quantization
pub const DEFAULT_GAMMA: f64 = 1.1;

/// Default error diffusion strength
pub const DEFAULT_DITHER_STRENGTH: f64 = 0.75;

/// Floyd-Steinberg weights: right, bottom-left, bottom, bottom-right
const FS_RIGHT: f64 = 7.0 / 16.0;
const FS_BOTTOM_LEFT: f64 = 3.0 / 16.0;
const FS_BOTTOM: f64 = 5.0 / 16.0;
const FS_BOTTOM_RIGHT: f64 = 1.0 / 16.0;

/// Simulation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid bitmap dimensions {width}x{height} for a {len} byte pixel buffer")]
    InvalidDimensions { width: u32, height: u32, len: usize },

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Pixel at ({x}, {y}) is not a palette color")]
    NotPaletteColor { x: u32, y: u32 },
}

/// Simulation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Exponent of the gamma pre-correction (`255 * (v/255)^gamma`)
    pub gamma: f64,
    /// Multiplier on the diffusion weights; 0 disables error propagation.
    /// Values above 1 amplify the error and are passed through unchanged.
    pub dither_strength: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            dither_strength: DEFAULT_DITHER_STRENGTH,
        }
    }
}

impl SimulationParams {
    pub fn new(gamma: f64, dither_strength: f64) -> Self {
        Self {
            gamma,
            dither_strength,
        }
    }

    /// Gentler settings used for the dashboard side-by-side preview
    pub fn soft_preview() -> Self {
        Self::new(1.05, 0.5)
    }

    /// Reject parameters the pipeline has no meaningful result for
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(SimulationError::InvalidParameter {
                name: "gamma",
                value: self.gamma,
            });
        }
        if !self.dither_strength.is_finite() || self.dither_strength < 0.0 {
            return Err(SimulationError::InvalidParameter {
                name: "dither_strength",
                value: self.dither_strength,
            });
        }
        Ok(())
    }
}

/// Simulate the e-ink rendering of `bitmap` with explicit parameters
pub fn process(
    bitmap: &Bitmap,
    gamma: f64,
    dither_strength: f64,
) -> Result<Bitmap, SimulationError> {
    simulate(bitmap, &SimulationParams::new(gamma, dither_strength))
}

/// Simulate the e-ink rendering of `bitmap`.
///
/// Returns a new bitmap of the same size whose RGB values are all Spectra
/// palette colors and whose alpha is 255. The input is never modified.
pub fn simulate(bitmap: &Bitmap, params: &SimulationParams) -> Result<Bitmap, SimulationError> {
    params.validate()?;

    let (width, height) = bitmap.dimensions();
    if bitmap.is_empty() {
        return Bitmap::new(width, height, Vec::new());
    }

    tracing::debug!(
        "Simulating e-ink preview {}x{} (gamma {}, dither strength {})",
        width,
        height,
        params.gamma,
        params.dither_strength
    );

    let mut buf = gamma_correct(bitmap.pixels(), params.gamma);
    diffuse(&mut buf, width as usize, height as usize, params.dither_strength);
    assemble(width, height, &buf)
}

/// Build the working buffer: RGB triples with `255 * (v/255)^gamma` applied.
/// Alpha is dropped.
fn gamma_correct(pixels: &[u8], gamma: f64) -> Vec<f32> {
    let mut buf = Vec::with_capacity(pixels.len() / 4 * 3);
    for px in pixels.chunks_exact(4) {
        for &v in &px[..3] {
            buf.push((255.0 * (v as f64 / 255.0).powf(gamma)) as f32);
        }
    }
    buf
}

/// Add `err * weight` to the working-buffer pixel at `idx`
#[inline]
fn spread(buf: &mut [f32], idx: usize, err: (f64, f64, f64), weight: f64) {
    buf[idx] = (buf[idx] as f64 + err.0 * weight) as f32;
    buf[idx + 1] = (buf[idx + 1] as f64 + err.1 * weight) as f32;
    buf[idx + 2] = (buf[idx + 2] as f64 + err.2 * weight) as f32;
}

/// Floyd-Steinberg scan in raster order (no serpentine).
///
/// Each pixel is quantized once using the error-accumulated value visible
/// when it is reached; error falling outside the image is dropped.
fn diffuse(buf: &mut [f32], width: usize, height: usize, strength: f64) {
    let w_right = FS_RIGHT * strength;
    let w_bottom_left = FS_BOTTOM_LEFT * strength;
    let w_bottom = FS_BOTTOM * strength;
    let w_bottom_right = FS_BOTTOM_RIGHT * strength;

    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) * 3;

            let old_r = buf[i] as f64;
            let old_g = buf[i + 1] as f64;
            let old_b = buf[i + 2] as f64;

            let (cr, cg, cb) = nearest_color(old_r, old_g, old_b).rgb();
            buf[i] = cr as f32;
            buf[i + 1] = cg as f32;
            buf[i + 2] = cb as f32;

            let err = (old_r - cr as f64, old_g - cg as f64, old_b - cb as f64);

            if x + 1 < width {
                spread(buf, i + 3, err, w_right);
            }

            if y + 1 < height {
                let below = i + width * 3;

                if x > 0 {
                    spread(buf, below - 3, err, w_bottom_left);
                }

                spread(buf, below, err, w_bottom);

                if x + 1 < width {
                    spread(buf, below + 3, err, w_bottom_right);
                }
            }
        }
    }
}

/// Convert the quantized working buffer back to RGBA8888 with full opacity
fn assemble(width: u32, height: u32, buf: &[f32]) -> Result<Bitmap, SimulationError> {
    let mut pixels = Vec::with_capacity(buf.len() / 3 * 4);
    for rgb in buf.chunks_exact(3) {
        pixels.extend(rgb.iter().map(|&v| to_channel(v)));
        pixels.push(255);
    }
    Bitmap::new(width, height, pixels)
}

/// Clamp to [0, 255] and round half to even
#[inline]
fn to_channel(v: f32) -> u8 {
    v.clamp(0.0, 255.0).round_ties_even() as u8
}

/// Count how many pixels of a simulated bitmap use each palette color.
///
/// Pixels that are not palette colors are ignored.
pub fn color_histogram(bitmap: &Bitmap) -> [usize; 7] {
    let mut counts = [0usize; 7];
    for px in bitmap.pixels().chunks_exact(4) {
        if let Some(color) = Color::from_rgb(px[0], px[1], px[2]) {
            counts[color.index()] += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Bitmap {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Bitmap::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_gamma_one_is_identity() {
        let buf = gamma_correct(&[0, 128, 255, 7], 1.0);
        assert_eq!(buf, vec![0.0, 128.0, 255.0]);
    }

    #[test]
    fn test_gamma_darkens_midtones() {
        let buf = gamma_correct(&[128, 128, 128, 255], 1.1);
        assert!(buf[0] < 128.0 && buf[0] > 100.0);
        // End points are fixed
        let ends = gamma_correct(&[0, 255, 0, 255], 2.2);
        assert_eq!(ends, vec![0.0, 255.0, 0.0]);
    }

    #[test]
    fn test_rejects_bad_gamma() {
        let bitmap = rgba(1, 1, |_, _| [10, 10, 10, 255]);
        for gamma in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = process(&bitmap, gamma, 0.5).unwrap_err();
            assert!(matches!(
                err,
                SimulationError::InvalidParameter { name: "gamma", .. }
            ));
        }
    }

    #[test]
    fn test_rejects_bad_strength_but_allows_amplified() {
        let bitmap = rgba(2, 2, |_, _| [90, 90, 90, 255]);
        assert!(process(&bitmap, 1.0, -0.1).is_err());
        assert!(process(&bitmap, 1.0, f64::NAN).is_err());
        assert!(process(&bitmap, 1.0, 2.5).is_ok());
    }

    #[test]
    fn test_empty_bitmap() {
        let bitmap = Bitmap::new(0, 3, Vec::new()).unwrap();
        let out = simulate(&bitmap, &SimulationParams::default()).unwrap();
        assert_eq!(out.dimensions(), (0, 3));
        assert!(out.pixels().is_empty());
    }

    #[test]
    fn test_alpha_is_ignored_and_forced_opaque() {
        let opaque = rgba(3, 2, |x, y| [(x * 80) as u8, (y * 120) as u8, 40, 255]);
        let clear = rgba(3, 2, |x, y| [(x * 80) as u8, (y * 120) as u8, 40, 0]);
        let a = simulate(&opaque, &SimulationParams::default()).unwrap();
        let b = simulate(&clear, &SimulationParams::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.pixels().chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_error_reaches_right_neighbour() {
        // Mid gray quantizes to black or white; the error must push the
        // next pixel the other way at full strength.
        let bitmap = rgba(2, 1, |_, _| [128, 128, 128, 255]);
        let out = process(&bitmap, 1.0, 1.0).unwrap();
        let first = out.pixel(0, 0).unwrap();
        let second = out.pixel(1, 0).unwrap();
        assert_ne!(first, second);

        let flat = process(&bitmap, 1.0, 0.0).unwrap();
        assert_eq!(flat.pixel(0, 0), flat.pixel(1, 0));
    }

    #[test]
    fn test_error_shares_and_edges() {
        // Gray 3x2 at strength 1, gamma 1:
        //   (0,0) 96  -> Green, err (96, -44, 36)
        //   (1,0) 0 + 7/16 of that = (42, -19.25, 15.75) -> Black, err (17, -44.25, -14.25)
        //   (2,0) 160 + 7/16 of that = (167.44, 140.64, 153.77) -> Blue;
        //         its right share falls off the edge and is dropped
        //   (0,1) 96 + 5/16 of (0,0) + 3/16 of (1,0) = (129.19, 73.95, 104.58) -> Red
        //   (1,1) gets 1/16 of (0,0) and 5/16 of (1,0), stays Black
        let values = [96u8, 0, 160, 96, 0, 0];
        let bitmap = rgba(3, 2, |x, y| {
            let v = values[(y * 3 + x) as usize];
            [v, v, v, 255]
        });

        let out = process(&bitmap, 1.0, 1.0).unwrap();
        let expected = [
            Color::Green,
            Color::Black,
            Color::Blue,
            Color::Red,
            Color::Black,
            Color::Black,
        ];
        for (i, color) in expected.iter().enumerate() {
            let px = out.pixel(i as u32 % 3, i as u32 / 3).unwrap();
            assert_eq!((px[0], px[1], px[2]), color.rgb(), "pixel {}", i);
        }
    }

    #[test]
    fn test_to_channel_clamps() {
        assert_eq!(to_channel(-12.0), 0);
        assert_eq!(to_channel(300.5), 255);
        assert_eq!(to_channel(140.0), 140);
        assert_eq!(to_channel(2.5), 2);
        assert_eq!(to_channel(f32::NAN), 0);
    }

    #[test]
    fn test_histogram_counts_all_pixels() {
        let bitmap = rgba(5, 4, |x, y| [(x * 60) as u8, (y * 80) as u8, 128, 255]);
        let out = simulate(&bitmap, &SimulationParams::default()).unwrap();
        assert_eq!(color_histogram(&out).iter().sum::<usize>(), 20);
    }
}
