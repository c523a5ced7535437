//! Frame decoding
//!
//! Turns compressed packets into raw audio frames. One packet may yield zero,
//! one or several frames, and a single decode call may consume only part of a
//! packet, so every call reports how many bytes it interpreted.
//!
//! [`SymphoniaFrameDecoder`] decodes with symphonia's default codec registry
//! (MP3, FLAC, AAC, Vorbis, PCM, ADPCM).

use super::types::{CompressedPacket, RawAudioFrame};
use crate::error::{DecodeErrorKind, Error, Result};
use pcmx_common::{ChannelLayout, SampleFormat};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CodecParameters as SymphoniaCodecParameters, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;
use symphonia::core::sample::{i24, u24, Sample};
use tracing::debug;

/// Result of one decode call
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    /// Frame produced by this call, if any
    pub frame: Option<RawAudioFrame>,

    /// Bytes of the packet interpreted by this call, with or without a frame
    pub bytes_consumed: usize,
}

impl DecodeOutcome {
    /// Bytes consumed into decoder-internal buffering, no frame yet
    pub fn consumed(bytes_consumed: usize) -> Self {
        Self {
            frame: None,
            bytes_consumed,
        }
    }

    pub fn produced(frame: RawAudioFrame, bytes_consumed: usize) -> Self {
        Self {
            frame: Some(frame),
            bytes_consumed,
        }
    }

    pub fn frame_produced(&self) -> bool {
        self.frame.is_some()
    }
}

/// Decoder boundary used by the pipeline.
///
/// Callers must not pass an exhausted packet. A call that consumes zero bytes
/// is a stall, even if it produced a frame; the pipeline aborts on it.
pub trait FrameDecoder {
    /// Decode from `packet.remaining()`.
    ///
    /// # Errors
    /// `Decode` on malformed input. Fatal to the transcode.
    fn decode(&mut self, packet: &CompressedPacket) -> Result<DecodeOutcome>;

    /// Release one frame still held inside the decoder after the last packet.
    ///
    /// Returns `None` once nothing is left.
    fn drain(&mut self) -> Result<Option<RawAudioFrame>> {
        Ok(None)
    }

    /// Samples per channel in a typical frame, when the codec declares it
    fn nominal_frame_size(&self) -> Option<usize> {
        None
    }
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn decode(&mut self, packet: &CompressedPacket) -> Result<DecodeOutcome> {
        (**self).decode(packet)
    }

    fn drain(&mut self) -> Result<Option<RawAudioFrame>> {
        (**self).drain()
    }

    fn nominal_frame_size(&self) -> Option<usize> {
        (**self).nominal_frame_size()
    }
}

/// Frame decoder backed by a symphonia codec.
///
/// Symphonia decoders consume whole packets, so every successful call reports
/// the full remaining length. Packets that only prime the decoder come back
/// as zero-length buffers and are reported as "consumed, no frame".
pub struct SymphoniaFrameDecoder {
    decoder: Box<dyn Decoder>,
    stream_id: u32,
    nominal_frame_size: Option<usize>,
}

impl SymphoniaFrameDecoder {
    /// Create a decoder for the stream described by `params`.
    ///
    /// # Errors
    /// - `CodecNotFound` if no registered codec handles the stream
    pub fn new(stream_id: u32, params: &SymphoniaCodecParameters) -> Result<Self> {
        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| Error::CodecNotFound(format!("stream {}: {}", stream_id, e)))?;

        let nominal_frame_size = params.max_frames_per_packet.map(|n| n as usize);

        debug!(
            "Created decoder for stream {}: {:?} (nominal frame size {:?})",
            stream_id,
            decoder.codec_params().codec,
            nominal_frame_size
        );

        Ok(Self {
            decoder,
            stream_id,
            nominal_frame_size,
        })
    }
}

impl FrameDecoder for SymphoniaFrameDecoder {
    fn decode(&mut self, packet: &CompressedPacket) -> Result<DecodeOutcome> {
        let remaining = packet.remaining();
        let input = Packet::new_from_slice(
            self.stream_id,
            packet.timestamp.unwrap_or(0),
            0,
            remaining,
        );

        let decoded = self.decoder.decode(&input).map_err(decode_error)?;
        if decoded.frames() == 0 {
            return Ok(DecodeOutcome::consumed(remaining.len()));
        }

        let frame = frame_from_buffer(&decoded)?;
        Ok(DecodeOutcome::produced(frame, remaining.len()))
    }

    fn nominal_frame_size(&self) -> Option<usize> {
        self.nominal_frame_size
    }
}

/// Map a symphonia error to a fatal decode error
fn decode_error(err: SymphoniaError) -> Error {
    let kind = match &err {
        SymphoniaError::DecodeError(_) => DecodeErrorKind::Malformed,
        SymphoniaError::IoError(_) => DecodeErrorKind::Io,
        SymphoniaError::ResetRequired => DecodeErrorKind::ResetRequired,
        SymphoniaError::Unsupported(_) => DecodeErrorKind::Unsupported,
        SymphoniaError::LimitError(_) => DecodeErrorKind::Limit,
        _ => DecodeErrorKind::Other,
    };
    Error::Decode {
        kind,
        message: err.to_string(),
    }
}

/// Copy a decoded symphonia buffer into a planar raw frame.
///
/// Formats without a raw counterpart are widened: 8-bit signed and 16-bit
/// unsigned to S16, 24-bit and 32-bit unsigned to S32.
fn frame_from_buffer(decoded: &AudioBufferRef) -> Result<RawAudioFrame> {
    let spec = decoded.spec();
    let channel_layout = ChannelLayout::with_channels(spec.channels.count() as u16)
        .ok_or_else(|| Error::Decode {
            kind: DecodeErrorKind::Other,
            message: "decoded buffer has no channels".to_string(),
        })?;

    let (sample_format, planes) = match decoded {
        AudioBufferRef::U8(buf) => (SampleFormat::U8P, planes_of(buf, |s: u8| [s])),
        AudioBufferRef::S16(buf) => (
            SampleFormat::S16P,
            planes_of(buf, |s: i16| s.to_le_bytes()),
        ),
        AudioBufferRef::S32(buf) => (
            SampleFormat::S32P,
            planes_of(buf, |s: i32| s.to_le_bytes()),
        ),
        AudioBufferRef::F32(buf) => (
            SampleFormat::F32P,
            planes_of(buf, |s: f32| s.to_le_bytes()),
        ),
        AudioBufferRef::F64(buf) => (
            SampleFormat::F64P,
            planes_of(buf, |s: f64| s.to_le_bytes()),
        ),
        AudioBufferRef::S8(buf) => (
            SampleFormat::S16P,
            planes_of(buf, |s: i8| ((s as i16) << 8).to_le_bytes()),
        ),
        AudioBufferRef::U16(buf) => (
            SampleFormat::S16P,
            planes_of(buf, |s: u16| ((s as i32 - 0x8000) as i16).to_le_bytes()),
        ),
        AudioBufferRef::S24(buf) => (
            SampleFormat::S32P,
            planes_of(buf, |s: i24| (s.inner() << 8).to_le_bytes()),
        ),
        AudioBufferRef::U24(buf) => (
            SampleFormat::S32P,
            planes_of(buf, |s: u24| {
                ((s.inner() as i32 - 0x80_0000) << 8).to_le_bytes()
            }),
        ),
        AudioBufferRef::U32(buf) => (
            SampleFormat::S32P,
            planes_of(buf, |s: u32| {
                ((s as i64 - 0x8000_0000) as i32).to_le_bytes()
            }),
        ),
    };

    Ok(RawAudioFrame {
        sample_format,
        channel_layout,
        sample_rate: spec.rate,
        sample_count: decoded.frames(),
        planes,
    })
}

/// One little-endian byte plane per channel
fn planes_of<S: Sample, const N: usize>(
    buf: &AudioBuffer<S>,
    encode: impl Fn(S) -> [u8; N],
) -> Vec<Vec<u8>> {
    (0..buf.spec().channels.count())
        .map(|ch| buf.chan(ch).iter().flat_map(|&s| encode(s)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::audio::{Channels, SignalSpec};
    use symphonia::core::codecs::{CODEC_TYPE_NULL, CODEC_TYPE_PCM_S16LE};

    #[test]
    fn test_null_codec_not_found() {
        let params = SymphoniaCodecParameters::new();
        let result = SymphoniaFrameDecoder::new(0, &params);
        assert!(matches!(result, Err(Error::CodecNotFound(_))));
        assert_eq!(params.codec, CODEC_TYPE_NULL);
    }

    #[test]
    fn test_decode_error_mapping() {
        match decode_error(SymphoniaError::DecodeError("invalid frame header")) {
            Error::Decode { kind, message } => {
                assert_eq!(kind, DecodeErrorKind::Malformed);
                assert!(message.contains("invalid frame header"));
            }
            other => panic!("Expected Decode error, got {:?}", other),
        }

        match decode_error(SymphoniaError::ResetRequired) {
            Error::Decode { kind, .. } => assert_eq!(kind, DecodeErrorKind::ResetRequired),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_from_f32_buffer() {
        let spec = SignalSpec::new(48000, Channels::FRONT_LEFT | Channels::FRONT_RIGHT);
        let mut buf = AudioBuffer::<f32>::new(4, spec);
        buf.render_reserved(Some(4));
        buf.chan_mut(0).copy_from_slice(&[0.5, 0.25, 0.0, -0.5]);
        buf.chan_mut(1).copy_from_slice(&[1.0, 0.0, 0.0, -1.0]);

        let frame = frame_from_buffer(&AudioBufferRef::F32(std::borrow::Cow::Borrowed(&buf)))
            .unwrap();

        assert_eq!(frame.sample_format, SampleFormat::F32P);
        assert_eq!(frame.channel_layout, ChannelLayout::STEREO);
        assert_eq!(frame.sample_rate, 48000);
        assert_eq!(frame.sample_count, 4);
        assert_eq!(frame.planes.len(), 2);
        assert_eq!(&frame.planes[0][0..4], &0.5f32.to_le_bytes());
        assert_eq!(&frame.planes[1][12..16], &(-1.0f32).to_le_bytes());
    }

    #[test]
    fn test_frame_from_u16_buffer_widens_to_s16() {
        let spec = SignalSpec::new(8000, Channels::FRONT_LEFT);
        let mut buf = AudioBuffer::<u16>::new(2, spec);
        buf.render_reserved(Some(2));
        buf.chan_mut(0).copy_from_slice(&[0x8000, 0xFFFF]);

        let frame = frame_from_buffer(&AudioBufferRef::U16(std::borrow::Cow::Borrowed(&buf)))
            .unwrap();

        assert_eq!(frame.sample_format, SampleFormat::S16P);
        assert_eq!(frame.planes[0], [0i16.to_le_bytes(), 32767i16.to_le_bytes()].concat());
    }

    #[test]
    fn test_decode_pcm_packet() {
        let mut params = SymphoniaCodecParameters::new();
        params
            .for_codec(CODEC_TYPE_PCM_S16LE)
            .with_sample_rate(44100)
            .with_channels(Channels::FRONT_LEFT | Channels::FRONT_RIGHT)
            .with_bits_per_sample(16)
            .with_bits_per_coded_sample(16)
            .with_max_frames_per_packet(4);

        let mut decoder = SymphoniaFrameDecoder::new(7, &params).unwrap();
        assert_eq!(decoder.nominal_frame_size(), Some(4));

        // Two stereo samples: (100, -100), (200, -200)
        let data: Vec<u8> = [100i16, -100, 200, -200]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let packet = CompressedPacket::new(7, data, Some(0));

        let outcome = decoder.decode(&packet).unwrap();
        assert_eq!(outcome.bytes_consumed, 8);

        // The PCM decoder may widen samples; only the shape is fixed here
        let frame = outcome.frame.expect("PCM packet should produce a frame");
        assert_eq!(frame.sample_count, 2);
        assert_eq!(frame.sample_rate, 44100);
        assert_eq!(frame.channel_layout, ChannelLayout::STEREO);
        assert_eq!(frame.planes.len(), 2);
        assert_eq!(frame.planes[0].len(), frame.expected_plane_len());

        // Whole-packet decoding leaves nothing to drain at end of stream
        assert!(decoder.drain().unwrap().is_none());
    }
}
