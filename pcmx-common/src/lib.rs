//! # pcmx Common Library
//!
//! Shared code for the pcmx crates:
//! - Output format descriptors (sample representation, channel layout, target format)
//! - TOML configuration loading and validation
//! - Common error type

pub mod config;
pub mod error;
pub mod format;

pub use config::TranscodeConfig;
pub use error::{Error, Result};
pub use format::{ChannelLayout, SampleFormat, TargetFormat};
