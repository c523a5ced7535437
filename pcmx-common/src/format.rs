//! Audio format descriptors
//!
//! Describes how raw samples are laid out in memory on both sides of the
//! converter: the decoder's native representation and the fixed output format.
//!
//! All multi-byte samples are little-endian.

use std::fmt;

/// Output sample rate used when nothing else is configured
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Sample representation of a raw audio buffer.
///
/// Packed formats carry all channels interleaved in a single plane
/// (`[L, R, L, R, ...]`); planar formats (`*P`) carry one plane per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    F32,
    F64,
    U8P,
    S16P,
    S32P,
    F32P,
    F64P,
}

impl SampleFormat {
    /// Size of one sample of one channel in bytes
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8P => 1,
            SampleFormat::S16 | SampleFormat::S16P => 2,
            SampleFormat::S32 | SampleFormat::S32P => 4,
            SampleFormat::F32 | SampleFormat::F32P => 4,
            SampleFormat::F64 | SampleFormat::F64P => 8,
        }
    }

    /// True when each channel lives in its own plane
    pub fn is_planar(self) -> bool {
        matches!(
            self,
            SampleFormat::U8P
                | SampleFormat::S16P
                | SampleFormat::S32P
                | SampleFormat::F32P
                | SampleFormat::F64P
        )
    }

    /// Number of planes a frame with `channels` channels carries
    pub fn plane_count(self, channels: usize) -> usize {
        if self.is_planar() {
            channels
        } else {
            1
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "flt",
            SampleFormat::F64 => "dbl",
            SampleFormat::U8P => "u8p",
            SampleFormat::S16P => "s16p",
            SampleFormat::S32P => "s32p",
            SampleFormat::F32P => "fltp",
            SampleFormat::F64P => "dblp",
        };
        f.write_str(name)
    }
}

/// Channel layout, identified by its channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    channels: u16,
}

impl ChannelLayout {
    pub const MONO: ChannelLayout = ChannelLayout { channels: 1 };
    pub const STEREO: ChannelLayout = ChannelLayout { channels: 2 };

    /// Default layout for the given channel count (`None` for zero channels)
    pub fn with_channels(channels: u16) -> Option<Self> {
        (channels > 0).then_some(Self { channels })
    }

    pub fn channel_count(self) -> usize {
        self.channels as usize
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channels {
            1 => f.write_str("mono"),
            2 => f.write_str("stereo"),
            n => write!(f, "{} channels", n),
        }
    }
}

/// Fixed output format of the transcoder.
///
/// The sample representation is always signed 16-bit little-endian,
/// interleaved. Only rate and layout are negotiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
}

impl TargetFormat {
    /// Output sample representation
    pub const SAMPLE_FORMAT: SampleFormat = SampleFormat::S16;

    pub fn new(sample_rate: u32, channel_layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            channel_layout,
        }
    }

    /// Bytes occupied by one sample across all channels
    pub fn frame_bytes(&self) -> usize {
        self.channel_layout.channel_count() * Self::SAMPLE_FORMAT.bytes_per_sample()
    }

    /// Bytes needed to hold `samples` samples per channel
    pub fn buffer_size(&self, samples: usize) -> usize {
        self.frame_bytes() * samples
    }
}

impl Default for TargetFormat {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, ChannelLayout::STEREO)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {}, {}",
            self.sample_rate,
            self.channel_layout,
            Self::SAMPLE_FORMAT
        )
    }
}
