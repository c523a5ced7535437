//! # pcmx transcoder library
//!
//! Streaming audio transcoding to raw PCM.
//!
//! **Purpose:** Open a media container, decode its first audio stream, and
//! write it as interleaved signed 16-bit little-endian PCM (44.1 kHz stereo by
//! default).
//!
//! **Architecture:** Single-threaded pipeline using symphonia + rubato
//! - `audio`: demux, stream selection, decode, convert, sink
//! - `pipeline`: driver state machine and source retry policy
//! - `transcode`: file-to-file entry point

pub mod audio;
pub mod error;
pub mod pipeline;
pub mod transcode;

pub use error::{DecodeErrorKind, Error, Result};
pub use pipeline::{Pipeline, PipelineOptions, PipelineState, TranscodeStats};
pub use transcode::transcode_file;
