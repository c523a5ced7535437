//! Audio stages of the transcoder
//!
//! **Architecture:** one stage per module, each behind a small trait so the
//! pipeline can be driven by scripted stages in tests.
//! - `source`: demux packets (symphonia format readers)
//! - `selector`: pick the audio stream
//! - `decoder`: packets to raw frames (symphonia codecs)
//! - `converter` + `resampler`: raw frames to S16 interleaved (rubato)
//! - `sink`: raw PCM writer

pub mod converter;
pub mod decoder;
pub mod resampler;
pub mod selector;
pub mod sink;
pub mod source;
pub mod types;

// Re-exports for external use (tests, pipeline)
pub use converter::{FormatConverter, InputFormat, PcmConverter, DEFAULT_NOMINAL_FRAME_SIZE};
pub use decoder::{DecodeOutcome, FrameDecoder, SymphoniaFrameDecoder};
pub use resampler::RateConverter;
pub use selector::select_audio_stream;
pub use sink::SinkWriter;
pub use source::{PacketSource, SourcePoll, SymphoniaSource};
pub use types::{CodecParameters, CompressedPacket, MediaType, RawAudioFrame, StreamDescriptor};
