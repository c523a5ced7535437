//! File-to-file transcoding
//!
//! Builds every stage from an input path and configuration, then runs the
//! pipeline. Stages acquired before a setup failure are released by
//! ownership as the error propagates.

use crate::audio::converter::{InputFormat, PcmConverter, DEFAULT_NOMINAL_FRAME_SIZE};
use crate::audio::decoder::{FrameDecoder, SymphoniaFrameDecoder};
use crate::audio::selector::select_audio_stream;
use crate::audio::sink::SinkWriter;
use crate::audio::source::{log_stream_table, PacketSource, SymphoniaSource};
use crate::error::{Error, Result};
use crate::pipeline::{Pipeline, PipelineOptions, RetryPolicy, TranscodeStats};
use pcmx_common::{ChannelLayout, TranscodeConfig};
use std::path::Path;
use tracing::info;

/// Transcode the first audio stream of `input` to raw PCM at `output`.
///
/// # Errors
/// Setup errors (`OpenSource`, `StreamInfo`, `NoAudioStreamFound`,
/// `CodecNotFound`, `Allocation`, `OpenSink`, `Config`) before any byte is
/// written; runtime errors from the pipeline afterwards.
pub fn transcode_file<P, Q>(input: P, output: Q, config: &TranscodeConfig) -> Result<TranscodeStats>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (input, output) = (input.as_ref(), output.as_ref());
    config.validate()?;
    let target = config.target_format()?;

    let source = SymphoniaSource::open(input)?;
    log_stream_table(input, source.streams());

    let index = select_audio_stream(source.streams())?;
    let stream = source.streams()[index].clone();
    let stream_id = stream.stream_id;

    let sample_rate = stream
        .codec
        .sample_rate
        .ok_or_else(|| Error::StreamInfo(format!("stream {} has no sample rate", stream_id)))?;
    let channel_layout = stream
        .codec
        .channels
        .and_then(ChannelLayout::with_channels)
        .ok_or_else(|| Error::StreamInfo(format!("stream {} has no channel layout", stream_id)))?;

    let params = source
        .codec_params(stream_id)
        .ok_or_else(|| Error::StreamInfo(format!("stream {} disappeared", stream_id)))?;
    let decoder = SymphoniaFrameDecoder::new(stream_id, params)?;

    let input_format = InputFormat {
        sample_rate,
        channel_layout,
        nominal_frame_size: decoder
            .nominal_frame_size()
            .unwrap_or(DEFAULT_NOMINAL_FRAME_SIZE),
    };
    let converter = PcmConverter::new(input_format, target)?;

    let sink = SinkWriter::create(output)?;

    info!(
        "Transcoding {} ({}, {} Hz {}) -> {} ({})",
        input.display(),
        stream.codec.codec_name,
        sample_rate,
        channel_layout,
        output.display(),
        target
    );

    let options = PipelineOptions {
        stream_id,
        retry: RetryPolicy::from(&config.source),
        flush_on_eos: config.decode.flush_on_eos,
    };

    let completed = Pipeline::new(source, decoder, converter, sink, options).run()?;
    Ok(completed.stats)
}
