//! Common error types for pcmx

use thiserror::Error;

/// Common result type for pcmx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the pcmx crates
#[derive(Error, Debug)]
pub enum Error {
    /// TOML document could not be parsed
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
