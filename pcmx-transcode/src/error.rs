//! Error types for pcmx-transcode
//!
//! Every variant is fatal to the transcode: there is no skip-and-continue mode.
//! A source that is only temporarily not ready never surfaces here unless the
//! retry budget runs out (`SourceUnavailable`).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Classification of decoder failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Malformed or corrupt bitstream
    Malformed,
    /// I/O failure inside the decoder
    Io,
    /// Decoder lost its state and requires a reset
    ResetRequired,
    /// Bitstream feature the decoder does not implement
    Unsupported,
    /// Decoder hit an internal resource limit
    Limit,
    /// Anything else
    Other,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeErrorKind::Malformed => "malformed",
            DecodeErrorKind::Io => "io",
            DecodeErrorKind::ResetRequired => "reset required",
            DecodeErrorKind::Unsupported => "unsupported",
            DecodeErrorKind::Limit => "limit",
            DecodeErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Main error type for pcmx-transcode
#[derive(Error, Debug)]
pub enum Error {
    // === Setup ===
    /// Input could not be opened or its container format was not recognized
    #[error("Could not open source file {path}: {message}")]
    OpenSource { path: PathBuf, message: String },

    /// Stream parameters needed to build the pipeline are missing
    #[error("Could not find stream information: {0}")]
    StreamInfo(String),

    /// No stream in the container carries audio
    #[error("No audio stream found")]
    NoAudioStreamFound,

    /// No decoder is registered for the stream's codec
    #[error("Codec not found: {0}")]
    CodecNotFound(String),

    /// Working state (converter, resampler, buffers) could not be created
    #[error("Could not allocate working state: {0}")]
    Allocation(String),

    /// Output could not be opened for writing
    #[error("Could not open output file {path}: {source}")]
    OpenSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(#[from] pcmx_common::Error),

    // === Streaming ===
    /// Decoder rejected the bitstream
    #[error("Error while decoding ({kind}): {message}")]
    Decode {
        kind: DecodeErrorKind,
        message: String,
    },

    /// Decoder reported no progress and no frame
    #[error("Decoder made no progress on packet of stream {stream_id} at offset {cursor}")]
    DecoderStalled { stream_id: u32, cursor: usize },

    /// Decoder claimed more bytes than the packet had left
    #[error("Decoder consumed {consumed} bytes but only {remaining} remained")]
    DecoderOverrun { consumed: usize, remaining: usize },

    /// Conversion to the output format failed
    #[error("Conversion error: {0}")]
    Convert(String),

    /// Frame parameters differ from those the converter was set up with
    #[error("Source format changed mid-stream: {0}")]
    FormatChanged(String),

    /// Demuxer failed while reading the next packet
    #[error("Demux error: {0}")]
    Demux(String),

    /// Source stayed "not ready" for the whole retry budget
    #[error("Source unavailable after {attempts} attempts")]
    SourceUnavailable { attempts: u32 },

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures raised while building the pipeline
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Error::OpenSource { .. }
                | Error::StreamInfo(_)
                | Error::NoAudioStreamFound
                | Error::CodecNotFound(_)
                | Error::Allocation(_)
                | Error::OpenSink { .. }
                | Error::Config(_)
        )
    }
}

/// Convenience Result type using pcmx-transcode Error
pub type Result<T> = std::result::Result<T, Error>;
