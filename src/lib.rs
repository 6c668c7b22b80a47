//! E-ink preview simulation for 7-color Spectra picture frames.
//!
//! Converts an RGBA bitmap into an approximation of how the panel will
//! render it: gamma pre-correction, Floyd-Steinberg error diffusion and
//! weighted nearest-color quantization to the fixed ink palette.
//!
//! ```
//! use spectra_preview::{process, Bitmap};
//!
//! let bitmap = Bitmap::new(1, 1, vec![0, 0, 0, 255])?;
//! let preview = process(&bitmap, 1.1, 0.75)?;
//! assert_eq!(preview.pixels(), &[25, 25, 30, 255]);
//! # Ok::<(), spectra_preview::SimulationError>(())
//! ```

pub mod config;
pub mod image_proc;

pub use config::{Config, ConfigError};
pub use image_proc::{
    nearest_color, pack_4bpp, process, simulate, Bitmap, Color, SimulationError,
    SimulationParams, SPECTRA_PALETTE,
};
