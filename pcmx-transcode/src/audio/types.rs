//! Core audio data types
//!
//! Structures passed between the pipeline stages: compressed packets coming out
//! of the demuxer, raw frames coming out of the decoder, and the read-only
//! stream table discovered when the input is opened.

use crate::error::{Error, Result};
use pcmx_common::{ChannelLayout, SampleFormat};
use std::fmt;

/// A demuxed unit of compressed data.
///
/// A packet may hold several codec frames, so the decoder can be invoked on it
/// more than once. `cursor` marks the first byte not yet handed to the decoder.
///
/// **Invariant:** `cursor <= data.len()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPacket {
    /// Stream this packet belongs to
    pub stream_id: u32,

    /// Compressed payload
    data: Vec<u8>,

    /// Presentation timestamp of the first byte, in stream time base units
    pub timestamp: Option<u64>,

    /// Offset of the first byte not yet decoded
    cursor: usize,
}

impl CompressedPacket {
    pub fn new(stream_id: u32, data: Vec<u8>, timestamp: Option<u64>) -> Self {
        Self {
            stream_id,
            data,
            timestamp,
            cursor: 0,
        }
    }

    /// Bytes not yet consumed by the decoder
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True once every byte has been handed to the decoder
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.data.len()
    }

    /// Move the cursor past `consumed` bytes.
    ///
    /// The timestamp is cleared: it described the start of the packet and must
    /// not be attributed to the fragment that follows.
    pub fn advance(&mut self, consumed: usize) -> Result<()> {
        let remaining = self.data.len() - self.cursor;
        if consumed > remaining {
            return Err(Error::DecoderOverrun {
                consumed,
                remaining,
            });
        }
        self.cursor += consumed;
        if consumed > 0 {
            self.timestamp = None;
        }
        Ok(())
    }
}

/// Raw decoded audio.
///
/// Planar formats carry one plane per channel; packed formats carry a single
/// interleaved plane. Each plane holds little-endian samples.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudioFrame {
    pub sample_format: SampleFormat,
    pub channel_layout: ChannelLayout,
    pub sample_rate: u32,

    /// Samples per channel
    pub sample_count: usize,

    pub planes: Vec<Vec<u8>>,
}

impl RawAudioFrame {
    /// Build an S16 planar frame from per-channel samples.
    ///
    /// Convenience for tests and synthetic sources.
    pub fn from_s16_planar(sample_rate: u32, channels: &[Vec<i16>]) -> Self {
        let sample_count = channels.first().map(|c| c.len()).unwrap_or(0);
        let planes = channels
            .iter()
            .map(|c| c.iter().flat_map(|s| s.to_le_bytes()).collect())
            .collect();

        Self {
            sample_format: SampleFormat::S16P,
            channel_layout: ChannelLayout::with_channels(channels.len() as u16)
                .unwrap_or(ChannelLayout::MONO),
            sample_rate,
            sample_count,
            planes,
        }
    }

    /// Bytes a well-formed frame carries in each plane
    pub fn expected_plane_len(&self) -> usize {
        let per_sample = self.sample_format.bytes_per_sample();
        if self.sample_format.is_planar() {
            self.sample_count * per_sample
        } else {
            self.sample_count * per_sample * self.channel_layout.channel_count()
        }
    }
}

/// Kind of elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Audio,
    Other,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Audio => f.write_str("audio"),
            MediaType::Other => f.write_str("other"),
        }
    }
}

/// Codec parameters as declared by the container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecParameters {
    /// Short codec name ("mp3", "aac", "pcm_s16le", ...)
    pub codec_name: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,

    /// Samples per channel in a typical frame (AAC: 1024, MP3: 1152)
    pub nominal_frame_size: Option<usize>,

    /// Time base as (numerator, denominator)
    pub time_base: Option<(u32, u32)>,
}

/// One entry of the container's stream table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub stream_id: u32,
    pub media_type: MediaType,
    pub codec: CodecParameters,
}

impl StreamDescriptor {
    pub fn audio(stream_id: u32, codec: CodecParameters) -> Self {
        Self {
            stream_id,
            media_type: MediaType::Audio,
            codec,
        }
    }

    pub fn other(stream_id: u32) -> Self {
        Self {
            stream_id,
            media_type: MediaType::Other,
            codec: CodecParameters::default(),
        }
    }
}
