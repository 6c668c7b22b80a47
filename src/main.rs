//! E-ink preview tool for 7-color Spectra picture frames
//!
//! A one-shot command that:
//! - Loads an image from a local path or an HTTP(S) URL
//! - Scales it to the preview width
//! - Simulates how the 7-color panel renders it
//! - Writes the result as PNG or as a packed panel buffer

use clap::Parser;
use spectra_preview::config::{Config, DEFAULT_CONFIG_PATH};
use spectra_preview::image_proc::{
    color_histogram, write_preview, Color, OutputFormat, PreviewProcessor, SimulationParams,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "spectra-preview")]
#[command(about = "Simulate how an image renders on a 7-color e-ink frame")]
#[command(version)]
struct Args {
    /// Source image path or http(s) URL
    source: String,

    /// Output file (PNG, or raw panel buffer with --packed)
    output: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Gamma exponent (overrides config)
    #[arg(long)]
    gamma: Option<f64>,

    /// Error diffusion strength (overrides config)
    #[arg(long = "dither-strength")]
    dither_strength: Option<f64>,

    /// Use the soft dashboard preview settings (gamma 1.05, strength 0.5)
    #[arg(long, conflicts_with_all = ["gamma", "dither_strength"])]
    soft: bool,

    /// Preview width in pixels (overrides config)
    #[arg(long)]
    width: Option<u32>,

    /// Keep the source resolution
    #[arg(long)]
    no_resize: bool,

    /// Fetch remote sources without the timestamp query parameter
    #[arg(long)]
    no_cache_bust: bool,

    /// Write a 4-bit packed panel buffer instead of a PNG
    #[arg(long)]
    packed: bool,

    /// Save the effective configuration to the config path
    #[arg(long)]
    write_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Current-thread runtime; the heavy work runs on the blocking pool
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration before logging so the file can enable verbose output
    let loaded = Config::load(&args.config);
    let file_verbose = loaded.as_ref().is_ok_and(|c| c.verbose);

    // Initialize logging
    init_logging(args.verbose || file_verbose);

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {}: {}", args.config, e);
        tracing::info!("Using default configuration");
        Config::default()
    });

    let config = apply_overrides(config, &args);
    config.validate()?;
    if config.amplifies_dither() {
        tracing::warn!(
            "dither_strength {} exceeds 1.0, error diffusion will be amplified",
            config.dither_strength
        );
    }

    if args.write_config {
        config.save(&args.config)?;
        tracing::info!("Configuration saved to {}", args.config);
    }

    let processor = PreviewProcessor::from_config(&config);
    tracing::info!(
        "Simulating with gamma {} and dither strength {}",
        processor.params().gamma,
        processor.params().dither_strength
    );
    let preview = processor.preview(&args.source).await?;

    let counts = color_histogram(&preview);
    for color in Color::all() {
        tracing::debug!("{:>6}: {} px", color.name(), counts[color.index()]);
    }

    let format = if args.packed {
        OutputFormat::Packed
    } else {
        OutputFormat::Png
    };
    write_preview(preview, &args.output, format)?;

    Ok(())
}

/// Merge command line overrides into the loaded configuration
fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if args.soft {
        let soft = SimulationParams::soft_preview();
        config.gamma = soft.gamma;
        config.dither_strength = soft.dither_strength;
    }
    if let Some(gamma) = args.gamma {
        config.gamma = gamma;
    }
    if let Some(strength) = args.dither_strength {
        config.dither_strength = strength;
    }
    if let Some(width) = args.width {
        config.preview_width = width;
    }
    if args.no_resize {
        config.resize = false;
    }
    if args.no_cache_bust {
        config.cache_bust = false;
    }
    config
}

/// Initialize tracing/logging
///
/// Default level is "warn"; --verbose switches to "debug".
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("spectra_preview={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
