//! Configuration loading for the pcmx transcoder
//!
//! Settings sources, highest priority first:
//! 1. Command-line flags (applied by the binary on top of the loaded config)
//! 2. TOML configuration file (`--config`)
//! 3. Built-in defaults (code constants below)
//!
//! Every section and key is optional; a missing key falls back to its default.

use crate::format::{ChannelLayout, TargetFormat, DEFAULT_SAMPLE_RATE};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Complete transcoder configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeConfig {
    /// Fixed output format
    pub output: OutputConfig,

    /// Packet source retry behavior
    pub source: SourceConfig,

    /// Decoder behavior
    pub decode: DecodeConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Output format section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Output channel count (2 = stereo)
    pub channels: u16,
}

/// Retry policy for a packet source that is temporarily not ready
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Consecutive "not ready" pulls tolerated before giving up
    pub retry_max_attempts: u32,

    /// First backoff delay in microseconds
    pub retry_initial_delay_us: u64,

    /// Upper bound for the backoff delay in milliseconds
    pub retry_max_delay_ms: u64,
}

/// Decoder section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    /// Drain decoder-buffered frames and resampler tail at end of stream
    pub flush_on_eos: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            retry_max_attempts: 50,
            retry_initial_delay_us: 100,
            retry_max_delay_ms: 20,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self { flush_on_eos: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TranscodeConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// Unlike an optional lookup, a path given explicitly must exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TranscodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.output.sample_rate == 0 {
            return Err(Error::InvalidInput(
                "output.sample_rate must be greater than zero".to_string(),
            ));
        }
        if self.output.channels == 0 {
            return Err(Error::InvalidInput(
                "output.channels must be greater than zero".to_string(),
            ));
        }
        if self.source.retry_max_attempts == 0 {
            return Err(Error::InvalidInput(
                "source.retry_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Output format described by the `[output]` section
    pub fn target_format(&self) -> Result<TargetFormat> {
        let layout = ChannelLayout::with_channels(self.output.channels).ok_or_else(|| {
            Error::InvalidInput("output.channels must be greater than zero".to_string())
        })?;
        Ok(TargetFormat::new(self.output.sample_rate, layout))
    }
}

impl SourceConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_micros(self.retry_initial_delay_us)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}
