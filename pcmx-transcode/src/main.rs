//! pcmx - transcode the first audio stream of a media file to raw PCM
//!
//! Output is interleaved signed 16-bit little-endian samples with no header,
//! 44.1 kHz stereo unless overridden.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pcmx_common::TranscodeConfig;
use pcmx_transcode::transcode_file;
use tracing::{error, info};

/// Command-line arguments for pcmx
#[derive(Parser, Debug)]
#[command(name = "pcmx")]
#[command(about = "Transcode the first audio stream of a media file to raw S16LE PCM")]
#[command(version)]
struct Args {
    /// Input media file
    input: PathBuf,

    /// Output raw PCM file (created or truncated)
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output sample rate in Hz (overrides config)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Output channel count (overrides config)
    #[arg(long)]
    channels: Option<u16>,

    /// Skip the end-of-stream flush (drops the resampler tail and any frames
    /// a decoder still holds; the built-in symphonia decoders hold none)
    #[arg(long)]
    no_flush: bool,

    /// Write transcode statistics as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Load the config file (if any) and apply command-line overrides
fn load_config(args: &Args) -> Result<TranscodeConfig> {
    let mut config = match &args.config {
        Some(path) => TranscodeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TranscodeConfig::default(),
    };

    if let Some(rate) = args.sample_rate {
        config.output.sample_rate = rate;
    }
    if let Some(channels) = args.channels {
        config.output.channels = channels;
    }
    if args.no_flush {
        config.decode.flush_on_eos = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(args: &Args, config: &TranscodeConfig) -> Result<()> {
    let stats = transcode_file(&args.input, &args.output, config).with_context(|| {
        format!(
            "Failed to transcode {} to {}",
            args.input.display(),
            args.output.display()
        )
    })?;

    info!(
        "Wrote {} bytes to {}",
        stats.bytes_written,
        args.output.display()
    );

    if let Some(report) = &args.report {
        stats
            .export_json(report)
            .with_context(|| format!("Failed to write report {}", report.display()))?;
        info!("Report written to {}", report.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = load_config(&args);

    // RUST_LOG wins over the configured level
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match config.and_then(|config| run(&args, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
