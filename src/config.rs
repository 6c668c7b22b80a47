//! Configuration management for the preview tool.
//!
//! Handles loading, saving, and validating configuration from JSON files.

use crate::image_proc::dither::{DEFAULT_DITHER_STRENGTH, DEFAULT_GAMMA};
use crate::image_proc::transform::DEFAULT_PREVIEW_WIDTH;
use crate::image_proc::download::DownloadConfig;
use crate::image_proc::{SimulationParams, TransformOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "spectra-preview.json";

/// Largest preview width accepted from configuration
pub const MAX_PREVIEW_WIDTH: u32 = 4096;

/// Largest number of download attempts accepted from configuration
pub const MAX_DOWNLOAD_RETRIES: u32 = 10;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Gamma exponent applied before quantization
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Error diffusion strength (0 disables dithering)
    #[serde(default = "default_dither_strength")]
    pub dither_strength: f64,

    /// Scale sources to `preview_width` before simulating
    #[serde(default = "default_true")]
    pub resize: bool,

    /// Preview width in pixels
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,

    /// Attempts per remote download
    #[serde(default = "default_download_retries")]
    pub download_retries: u32,

    /// Append a timestamp to remote URLs so caches are bypassed
    #[serde(default = "default_true")]
    pub cache_bust: bool,

    /// Debug logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_dither_strength() -> f64 {
    DEFAULT_DITHER_STRENGTH
}

fn default_true() -> bool {
    true
}

fn default_preview_width() -> u32 {
    DEFAULT_PREVIEW_WIDTH
}

fn default_download_retries() -> u32 {
    DownloadConfig::default().max_retries
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            dither_strength: default_dither_strength(),
            resize: true,
            preview_width: default_preview_width(),
            download_retries: default_download_retries(),
            cache_bust: true,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file atomically
    ///
    /// Writes to a temporary file and renames it over the target, so a
    /// crash mid-write never leaves a truncated config behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;

        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            ConfigError::ReadError(e)
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "gamma must be a positive number, got {}",
                self.gamma
            )));
        }

        if !self.dither_strength.is_finite() || self.dither_strength < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "dither_strength must be zero or positive, got {}",
                self.dither_strength
            )));
        }

        if self.preview_width == 0 || self.preview_width > MAX_PREVIEW_WIDTH {
            return Err(ConfigError::ValidationError(format!(
                "preview_width must be between 1 and {}",
                MAX_PREVIEW_WIDTH
            )));
        }

        if self.download_retries == 0 || self.download_retries > MAX_DOWNLOAD_RETRIES {
            return Err(ConfigError::ValidationError(format!(
                "download_retries must be between 1 and {}",
                MAX_DOWNLOAD_RETRIES
            )));
        }

        Ok(())
    }

    /// Whether the strength scales diffused error beyond plain Floyd-Steinberg.
    /// Such values are valid but usually a mistake.
    pub fn amplifies_dither(&self) -> bool {
        self.dither_strength > 1.0
    }

    /// Simulation parameters for this configuration
    pub fn params(&self) -> SimulationParams {
        SimulationParams::new(self.gamma, self.dither_strength)
    }

    /// Preview sizing for this configuration
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            resize: self.resize,
            target_width: self.preview_width,
        }
    }

    /// Remote fetch settings for this configuration
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            max_retries: self.download_retries,
            bust_cache: self.cache_bust,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("spectra-preview-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.params(), SimulationParams::default());
        assert_eq!(config.preview_width, 800);
        assert_eq!(config.download_retries, 3);
        assert!(config.cache_bust);
        assert!(!config.verbose);
    }

    #[test]
    fn test_logging_and_download_fields_parse() {
        let config: Config =
            serde_json::from_str(r#"{"verbose": true, "cache_bust": false, "download_retries": 5}"#)
                .unwrap();
        assert!(config.verbose);
        assert!(config.validate().is_ok());

        let download = config.download_config();
        assert_eq!(download.max_retries, 5);
        assert!(!download.bust_cache);
        assert_eq!(download.retry_delay, DownloadConfig::default().retry_delay);
    }

    #[test]
    fn test_amplified_dither_is_flagged_not_rejected() {
        let mut config = Config::default();
        assert!(!config.amplifies_dither());

        config.dither_strength = 1.0;
        assert!(!config.amplifies_dither());

        config.dither_strength = 2.5;
        assert!(config.amplifies_dither());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.gamma = 0.0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.dither_strength = -0.5;
        assert!(config.validate().is_err());

        config = Config::default();
        config.dither_strength = 1.5;
        assert!(config.validate().is_ok());

        config = Config::default();
        config.preview_width = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.download_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let config = Config {
            gamma: 1.05,
            dither_strength: 0.5,
            resize: false,
            preview_width: 480,
            download_retries: 2,
            cache_bust: false,
            verbose: true,
        };

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let path = temp_path("invalid");
        std::fs::write(&path, r#"{"gamma": -1.0}"#).unwrap();
        let result = Config::load(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/spectra-preview.json"),
            Err(ConfigError::ReadError(_))
        ));
    }
}
