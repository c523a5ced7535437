//! Conversion to the fixed output format
//!
//! Every decoded frame goes through the same four steps:
//! 1. Unpack: source samples (any [`SampleFormat`]) to planar f32 in [-1.0, 1.0]
//! 2. Remix: source channel count to the target layout
//! 3. Resample: only when source and target rates differ
//! 4. Quantize: interleaved signed 16-bit little-endian
//!
//! The source format is negotiated once, from the stream's declared codec
//! parameters. A frame whose rate or channel count differs from it is
//! rejected rather than silently re-negotiated.

use super::resampler::RateConverter;
use super::types::RawAudioFrame;
use crate::error::{Error, Result};
use pcmx_common::{ChannelLayout, SampleFormat, TargetFormat};
use tracing::debug;

/// Frame size assumed when the codec declares none (MP3 frame)
pub const DEFAULT_NOMINAL_FRAME_SIZE: usize = 1152;

/// Converter boundary used by the pipeline
pub trait FormatConverter {
    /// Convert one frame; the returned bytes are exactly what must be written.
    ///
    /// # Errors
    /// `Convert` for an empty or malformed frame, `FormatChanged` when the
    /// frame does not match the negotiated input format.
    fn convert(&mut self, frame: &RawAudioFrame) -> Result<&[u8]>;

    /// Emit whatever the converter still buffers at end of stream
    fn flush(&mut self) -> Result<&[u8]> {
        Ok(&[])
    }
}

impl<C: FormatConverter + ?Sized> FormatConverter for Box<C> {
    fn convert(&mut self, frame: &RawAudioFrame) -> Result<&[u8]> {
        (**self).convert(frame)
    }

    fn flush(&mut self) -> Result<&[u8]> {
        (**self).flush()
    }
}

/// Input side of a conversion, fixed for the whole stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormat {
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,

    /// Samples per channel in a typical frame
    pub nominal_frame_size: usize,
}

/// Output byte buffer reused across conversion calls.
///
/// **Invariant:** `len() <= capacity()`. Capacity is declared up front from the
/// target format and re-derived explicitly when a larger frame arrives.
#[derive(Debug)]
pub struct OutputBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl OutputBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Raise the declared capacity to at least `needed` bytes.
    ///
    /// Returns true when the capacity changed.
    pub fn ensure_capacity(&mut self, needed: usize) -> bool {
        if needed <= self.capacity {
            return false;
        }
        self.data.reserve(needed - self.data.len());
        self.capacity = needed;
        true
    }

    fn push_s16(&mut self, sample: i16) {
        debug_assert!(self.data.len() + 2 <= self.capacity);
        self.data.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Negotiated conversion state: input format, output format, resampler
pub struct ConversionContext {
    input: InputFormat,
    output: TargetFormat,
    resampler: Option<RateConverter>,
}

impl ConversionContext {
    /// # Errors
    /// `Allocation` if the resampler cannot be built for these rates.
    pub fn new(input: InputFormat, output: TargetFormat) -> Result<Self> {
        if input.sample_rate == 0 || output.sample_rate == 0 {
            return Err(Error::Allocation(format!(
                "Invalid sample rates: {} Hz -> {} Hz",
                input.sample_rate, output.sample_rate
            )));
        }

        let resampler = if input.sample_rate != output.sample_rate {
            Some(RateConverter::new(
                input.sample_rate,
                output.sample_rate,
                output.channel_layout.channel_count(),
                input.nominal_frame_size.max(1),
            )?)
        } else {
            None
        };

        Ok(Self {
            input,
            output,
            resampler,
        })
    }

    pub fn input(&self) -> &InputFormat {
        &self.input
    }

    pub fn output(&self) -> &TargetFormat {
        &self.output
    }

    pub fn is_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    /// Output samples per channel one input frame of `input_samples` may yield
    fn max_output_samples(&self, input_samples: usize) -> usize {
        match &self.resampler {
            Some(resampler) => resampler.max_output_frames(input_samples),
            None => input_samples,
        }
    }
}

/// Converter to interleaved S16 PCM in the target format
pub struct PcmConverter {
    ctx: ConversionContext,
    unpacked: Vec<Vec<f32>>,
    remixed: Vec<Vec<f32>>,
    resampled: Vec<Vec<f32>>,
    out: OutputBuffer,
}

impl PcmConverter {
    pub fn new(input: InputFormat, output: TargetFormat) -> Result<Self> {
        let ctx = ConversionContext::new(input, output)?;
        let capacity = output.buffer_size(ctx.max_output_samples(input.nominal_frame_size));

        debug!(
            "Converter: {} Hz {} -> {} (output buffer {} bytes)",
            input.sample_rate, input.channel_layout, output, capacity
        );

        Ok(Self {
            ctx,
            unpacked: Vec::new(),
            remixed: Vec::new(),
            resampled: Vec::new(),
            out: OutputBuffer::with_capacity(capacity),
        })
    }

    pub fn context(&self) -> &ConversionContext {
        &self.ctx
    }

    /// Declared capacity of the reused output buffer
    pub fn output_capacity(&self) -> usize {
        self.out.capacity()
    }

    fn check_frame(&self, frame: &RawAudioFrame) -> Result<()> {
        if frame.sample_count == 0 {
            return Err(Error::Convert("frame holds no samples".to_string()));
        }

        let input = &self.ctx.input;
        if frame.sample_rate != input.sample_rate || frame.channel_layout != input.channel_layout {
            return Err(Error::FormatChanged(format!(
                "expected {} Hz {}, got {} Hz {}",
                input.sample_rate, input.channel_layout, frame.sample_rate, frame.channel_layout
            )));
        }

        let planes = frame
            .sample_format
            .plane_count(frame.channel_layout.channel_count());
        let plane_len = frame.expected_plane_len();
        if frame.planes.len() != planes || frame.planes.iter().any(|p| p.len() < plane_len) {
            return Err(Error::Convert(format!(
                "{} frame of {} samples needs {} plane(s) of {} bytes",
                frame.sample_format, frame.sample_count, planes, plane_len
            )));
        }

        Ok(())
    }

    /// Quantize `planar` into the output buffer, growing it if needed
    fn emit<'a>(out: &'a mut OutputBuffer, output: &TargetFormat, planar: &[Vec<f32>]) -> &'a [u8] {
        let samples = planar.first().map_or(0, |c| c.len());
        out.clear();
        if out.ensure_capacity(output.buffer_size(samples)) {
            debug!("Output buffer grown to {} bytes", out.capacity());
        }
        for i in 0..samples {
            for channel in planar {
                out.push_s16(to_s16(channel[i]));
            }
        }
        out.as_slice()
    }
}

impl FormatConverter for PcmConverter {
    fn convert(&mut self, frame: &RawAudioFrame) -> Result<&[u8]> {
        self.check_frame(frame)?;

        unpack_planar(frame, &mut self.unpacked);
        remix(
            &self.unpacked,
            &mut self.remixed,
            self.ctx.output.channel_layout.channel_count(),
        );

        match self.ctx.resampler.as_mut() {
            Some(resampler) => {
                reset_planes(&mut self.resampled, self.remixed.len());
                resampler.process(&self.remixed, &mut self.resampled)?;
                Ok(Self::emit(&mut self.out, &self.ctx.output, &self.resampled))
            }
            None => Ok(Self::emit(&mut self.out, &self.ctx.output, &self.remixed)),
        }
    }

    fn flush(&mut self) -> Result<&[u8]> {
        match self.ctx.resampler.as_mut() {
            Some(resampler) => {
                reset_planes(&mut self.resampled, self.ctx.output.channel_layout.channel_count());
                resampler.flush(&mut self.resampled)?;
                Ok(Self::emit(&mut self.out, &self.ctx.output, &self.resampled))
            }
            None => Ok(&[]),
        }
    }
}

/// Resize to `channels` empty planes, keeping allocations
fn reset_planes(planes: &mut Vec<Vec<f32>>, channels: usize) {
    planes.resize_with(channels, Vec::new);
    for plane in planes.iter_mut() {
        plane.clear();
    }
}

fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(&bytes[..N]);
    array
}

/// Unpack any raw sample format to planar f32 in [-1.0, 1.0]
fn unpack_planar(frame: &RawAudioFrame, planar: &mut Vec<Vec<f32>>) {
    let channels = frame.channel_layout.channel_count();
    let samples = frame.sample_count;
    reset_planes(planar, channels);

    let width = frame.sample_format.bytes_per_sample();
    let decode: fn(&[u8]) -> f32 = match frame.sample_format {
        SampleFormat::U8 | SampleFormat::U8P => |b| (b[0] as f32 - 128.0) / 128.0,
        SampleFormat::S16 | SampleFormat::S16P => |b| i16::from_le_bytes(le(b)) as f32 / 32768.0,
        SampleFormat::S32 | SampleFormat::S32P => {
            |b| (i32::from_le_bytes(le(b)) as f64 / 2_147_483_648.0) as f32
        }
        SampleFormat::F32 | SampleFormat::F32P => |b| f32::from_le_bytes(le(b)),
        SampleFormat::F64 | SampleFormat::F64P => |b| f64::from_le_bytes(le(b)) as f32,
    };

    if frame.sample_format.is_planar() {
        for (channel, plane) in planar.iter_mut().zip(&frame.planes) {
            channel.extend(plane.chunks_exact(width).take(samples).map(decode));
        }
    } else {
        let interleaved = frame.planes[0].chunks_exact(width).take(samples * channels);
        for (i, bytes) in interleaved.enumerate() {
            planar[i % channels].push(decode(bytes));
        }
    }
}

/// Map `input` channels onto `out_channels` channels.
///
/// Fewer output channels: output `j` averages inputs `j, j + out, j + 2*out, ...`
/// (stereo to mono averages, 5.1 to stereo folds even/odd channels).
/// More output channels: inputs repeat (mono to stereo duplicates).
fn remix(input: &[Vec<f32>], output: &mut Vec<Vec<f32>>, out_channels: usize) {
    let in_channels = input.len();
    let samples = input.first().map_or(0, |c| c.len());
    reset_planes(output, out_channels);

    for (j, out) in output.iter_mut().enumerate() {
        if in_channels <= out_channels {
            out.extend_from_slice(&input[j % in_channels]);
        } else {
            let sources: Vec<&Vec<f32>> = input.iter().skip(j).step_by(out_channels).collect();
            let scale = 1.0 / sources.len() as f32;
            out.extend((0..samples).map(|i| sources.iter().map(|s| s[i]).sum::<f32>() * scale));
        }
    }
}

fn to_s16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}
