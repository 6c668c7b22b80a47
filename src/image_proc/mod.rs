//! Image processing module.
//!
//! The simulation core (`palette`, `dither`, `bitmap`) is pure and does no
//! I/O. `download`, `transform` and `output` surround it with loading,
//! preview sizing and encoding.

pub mod bitmap;
pub mod dither;
pub mod download;
pub mod output;
pub mod palette;
pub mod transform;

pub use bitmap::Bitmap;
pub use dither::{color_histogram, process, simulate, SimulationError, SimulationParams};
pub use download::{download_image, is_remote, DownloadConfig, DownloadError};
pub use output::{pack_4bpp, save_png};
pub use palette::{nearest_color, Color, SPECTRA_PALETTE};
pub use transform::{transform_image, TransformOptions};

use crate::config::Config;
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

/// Image processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Runs the full preview pipeline for one source image
pub struct PreviewProcessor {
    params: SimulationParams,
    transform: TransformOptions,
    download: DownloadConfig,
}

impl PreviewProcessor {
    pub fn new(params: SimulationParams, transform: TransformOptions) -> Self {
        Self {
            params,
            transform,
            download: DownloadConfig::default(),
        }
    }

    /// Build a processor from the configuration file values
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.params(), config.transform_options())
            .with_download_config(config.download_config())
    }

    /// Override how remote sources are fetched
    pub fn with_download_config(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    pub fn download_config(&self) -> &DownloadConfig {
        &self.download
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Load a source and simulate how it renders on the panel
    ///
    /// Full pipeline:
    /// 1. Load image from a path or URL
    /// 2. Scale to the preview width
    /// 3. Gamma, dither and quantize to the Spectra palette
    pub async fn preview(&self, source: &str) -> Result<Bitmap, ProcessingError> {
        tracing::info!("Starting preview pipeline for {}", source);

        let img = load_source(source, &self.download).await?;
        let bitmap = self.preview_image(img).await?;

        tracing::info!("Preview complete ({}x{})", bitmap.width(), bitmap.height());
        Ok(bitmap)
    }

    /// Scale and simulate an already decoded image
    ///
    /// Runs on the blocking pool since the scan is CPU bound.
    pub async fn preview_image(&self, img: DynamicImage) -> Result<Bitmap, ProcessingError> {
        let params = self.params;
        let transform = self.transform.clone();

        tokio::task::spawn_blocking(move || -> Result<Bitmap, ProcessingError> {
            let bitmap = transform_image(img, &transform);
            let started = Instant::now();
            let out = simulate(&bitmap, &params)?;
            tracing::debug!("Simulation took {:?}", started.elapsed());
            Ok(out)
        })
        .await
        .map_err(|e| ProcessingError::Task(e.to_string()))?
    }
}

/// Decode a local file or download a remote image
pub async fn load_source(
    source: &str,
    download: &DownloadConfig,
) -> Result<DynamicImage, ProcessingError> {
    if is_remote(source) {
        return Ok(download_image(source, download).await?);
    }

    let path = source.to_string();
    let img = tokio::task::spawn_blocking(move || image::open(path))
        .await
        .map_err(|e| ProcessingError::Task(e.to_string()))??;

    tracing::info!("Image decoded: {}x{}", img.width(), img.height());
    Ok(img)
}

/// How a finished preview is written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// RGBA PNG for viewing
    Png,
    /// Raw 4-bit panel buffer, 2 pixels per byte
    Packed,
}

/// Write a preview to `path` in the requested format
pub fn write_preview(
    bitmap: Bitmap,
    path: &Path,
    format: OutputFormat,
) -> Result<(), ProcessingError> {
    match format {
        OutputFormat::Png => save_png(bitmap, path)?,
        OutputFormat::Packed => std::fs::write(path, pack_4bpp(&bitmap)?)?,
    }
    tracing::info!("Wrote {:?} preview to {}", format, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[tokio::test]
    async fn test_preview_image_resizes_and_quantizes() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(40, 20, |x, y| {
            image::Rgb([(x * 6) as u8, (y * 12) as u8, 100])
        }));
        let processor = PreviewProcessor::new(
            SimulationParams::default(),
            TransformOptions {
                resize: true,
                target_width: 20,
            },
        );

        let out = processor.preview_image(img).await.unwrap();
        assert_eq!(out.dimensions(), (20, 10));
        assert_eq!(color_histogram(&out).iter().sum::<usize>(), 200);
    }

    #[tokio::test]
    async fn test_invalid_params_surface_as_simulation_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let processor = PreviewProcessor::new(
            SimulationParams::new(0.0, 0.5),
            TransformOptions {
                resize: false,
                ..Default::default()
            },
        );

        let err = processor.preview_image(img).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Simulation(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_source("/nonexistent/spectra-preview.png", &DownloadConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Image(_)));
    }

    #[test]
    fn test_from_config_carries_download_settings() {
        let config = Config {
            download_retries: 1,
            cache_bust: false,
            ..Default::default()
        };
        let processor = PreviewProcessor::from_config(&config);
        assert_eq!(processor.download_config().max_retries, 1);
        assert!(!processor.download_config().bust_cache);
        assert_eq!(processor.params(), &config.params());
    }

    #[test]
    fn test_write_packed_preview() {
        let (r, g, b) = Color::White.rgb();
        let bitmap = Bitmap::from_pixel(4, 2, [r, g, b, 255]).unwrap();
        let path = std::env::temp_dir().join(format!(
            "spectra-preview-packed-{}.bin",
            std::process::id()
        ));

        write_preview(bitmap, &path, OutputFormat::Packed).unwrap();
        let written = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(written, vec![0x11; 4]);
    }
}
