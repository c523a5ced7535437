//! Compressed packet sources
//!
//! A packet source exposes the container's stream table and yields demuxed
//! packets one at a time. The pipeline depends only on [`PacketSource`];
//! [`SymphoniaSource`] is the file-backed implementation.

use super::types::{CodecParameters, CompressedPacket, MediaType, StreamDescriptor};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use symphonia::core::codecs::{CodecParameters as SymphoniaCodecParameters, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, trace, warn};

/// Result of one pull from a packet source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePoll {
    /// Next demuxed packet
    Packet(CompressedPacket),

    /// Nothing available yet; the same pull may be retried
    NotReady,

    /// No more packets will be produced
    EndOfStream,
}

/// Demuxer boundary used by the pipeline
pub trait PacketSource {
    /// Stream table, in container order
    fn streams(&self) -> &[StreamDescriptor];

    /// Pull the next packet.
    ///
    /// # Errors
    /// Fatal demux failures. A transient condition is reported as
    /// `SourcePoll::NotReady`, never as an error.
    fn next_packet(&mut self) -> Result<SourcePoll>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn streams(&self) -> &[StreamDescriptor] {
        (**self).streams()
    }

    fn next_packet(&mut self) -> Result<SourcePoll> {
        (**self).next_packet()
    }
}

/// File-backed packet source using symphonia's format probe
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    streams: Vec<StreamDescriptor>,
}

impl SymphoniaSource {
    /// Open a media file and probe its container format.
    ///
    /// The file extension is passed to the probe as a hint; the content decides.
    ///
    /// # Errors
    /// - `OpenSource` if the file cannot be opened or the format is unrecognized
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening source: {}", path.display());

        let file = File::open(path).map_err(|e| Error::OpenSource {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::OpenSource {
                path: path.to_path_buf(),
                message: format!("Failed to probe format: {}", e),
            })?;

        let format = probed.format;
        let streams = format
            .tracks()
            .iter()
            .map(|track| describe_track(track.id, &track.codec_params))
            .collect();

        Ok(Self { format, streams })
    }

    /// Symphonia's own parameters for a stream, needed to build its decoder
    pub fn codec_params(&self, stream_id: u32) -> Option<&SymphoniaCodecParameters> {
        self.format
            .tracks()
            .iter()
            .find(|t| t.id == stream_id)
            .map(|t| &t.codec_params)
    }
}

impl PacketSource for SymphoniaSource {
    fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    fn next_packet(&mut self) -> Result<SourcePoll> {
        match self.format.next_packet() {
            Ok(packet) => {
                let (stream_id, ts) = (packet.track_id(), packet.ts());
                trace!("Packet: stream={} ts={} size={}", stream_id, ts, packet.data.len());
                Ok(SourcePoll::Packet(CompressedPacket::new(
                    stream_id,
                    packet.data.into_vec(),
                    Some(ts),
                )))
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("Reached end of stream");
                Ok(SourcePoll::EndOfStream)
            }
            Err(SymphoniaError::IoError(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) =>
            {
                Ok(SourcePoll::NotReady)
            }
            Err(SymphoniaError::ResetRequired) => {
                // Chained streams (new track list) are not followed
                warn!("Track list changed mid-stream, treating as end of stream");
                Ok(SourcePoll::EndOfStream)
            }
            Err(e) => Err(Error::Demux(e.to_string())),
        }
    }
}

/// Map a symphonia track to a stream table entry
fn describe_track(id: u32, params: &SymphoniaCodecParameters) -> StreamDescriptor {
    if params.codec == CODEC_TYPE_NULL {
        return StreamDescriptor::other(id);
    }

    let codec_name = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|d| d.short_name.to_string())
        .unwrap_or_else(|| format!("{:?}", params.codec));

    StreamDescriptor {
        stream_id: id,
        media_type: MediaType::Audio,
        codec: CodecParameters {
            codec_name,
            sample_rate: params.sample_rate,
            channels: params.channels.map(|c| c.count() as u16),
            nominal_frame_size: params.max_frames_per_packet.map(|n| n as usize),
            time_base: params.time_base.map(|tb| (tb.numer, tb.denom)),
        },
    }
}

/// Log the stream table of an opened input
pub fn log_stream_table(input: &Path, streams: &[StreamDescriptor]) {
    info!("Input {}: {} stream(s)", input.display(), streams.len());
    for (index, stream) in streams.iter().enumerate() {
        match stream.media_type {
            MediaType::Audio => {
                let codec = &stream.codec;
                info!(
                    "  Stream #{} (id {}): audio, {}, {} Hz, {} channels, frame size {}",
                    index,
                    stream.stream_id,
                    codec.codec_name,
                    codec.sample_rate.map_or("?".to_string(), |r| r.to_string()),
                    codec.channels.map_or("?".to_string(), |c| c.to_string()),
                    codec.nominal_frame_size.map_or("?".to_string(), |n| n.to_string()),
                );
            }
            MediaType::Other => {
                info!("  Stream #{} (id {}): other", index, stream.stream_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::audio::Channels;
    use symphonia::core::codecs::CODEC_TYPE_PCM_S16LE;
    use symphonia::core::units::TimeBase;

    #[test]
    fn test_open_nonexistent_file() {
        let result = SymphoniaSource::open("/nonexistent/file.mp3");
        assert!(matches!(result, Err(Error::OpenSource { .. })));
    }

    #[test]
    fn test_describe_null_codec_as_other() {
        let params = SymphoniaCodecParameters::new();
        let stream = describe_track(3, &params);
        assert_eq!(stream.media_type, MediaType::Other);
        assert_eq!(stream.stream_id, 3);
    }

    #[test]
    fn test_describe_pcm_track() {
        let mut params = SymphoniaCodecParameters::new();
        params
            .for_codec(CODEC_TYPE_PCM_S16LE)
            .with_sample_rate(48000)
            .with_channels(Channels::FRONT_LEFT | Channels::FRONT_RIGHT)
            .with_max_frames_per_packet(1152)
            .with_time_base(TimeBase::new(1, 48000));

        let stream = describe_track(1, &params);
        assert_eq!(stream.media_type, MediaType::Audio);
        assert_eq!(stream.codec.sample_rate, Some(48000));
        assert_eq!(stream.codec.channels, Some(2));
        assert_eq!(stream.codec.nominal_frame_size, Some(1152));
        assert_eq!(stream.codec.time_base, Some((1, 48000)));
    }
}
