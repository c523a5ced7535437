//! Pipeline driver: source → decoder → converter → sink
//!
//! **State machine:** `Init → Streaming → Draining → Done`, with `Error`
//! reachable from any state.
//!
//! - Streaming: packets are pulled one at a time. Each packet of the selected
//!   stream is decoded until every byte is consumed, and each produced frame is
//!   converted and written before the next decode call.
//! - Draining: frames still held by the decoder and the converter's resampler
//!   tail are written (unless disabled), then the sink is flushed.
//!
//! The driver owns every stage. Whatever path `run` takes, the stages are
//! dropped exactly once when it returns.

use super::retry::RetryPolicy;
use crate::audio::converter::FormatConverter;
use crate::audio::decoder::FrameDecoder;
use crate::audio::sink::SinkWriter;
use crate::audio::source::{PacketSource, SourcePoll};
use crate::audio::types::{CompressedPacket, RawAudioFrame};
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::thread;
use tracing::{debug, info, trace, warn};

/// Driver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Init,
    Streaming,
    Draining,
    Done,
    Error,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::Streaming => "streaming",
            PipelineState::Draining => "draining",
            PipelineState::Done => "done",
            PipelineState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Per-run driver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Stream whose packets are decoded; all others are skipped
    pub stream_id: u32,

    pub retry: RetryPolicy,

    /// Write decoder-buffered frames and the resampler tail at end of stream
    pub flush_on_eos: bool,
}

impl PipelineOptions {
    pub fn new(stream_id: u32) -> Self {
        Self {
            stream_id,
            retry: RetryPolicy::default(),
            flush_on_eos: true,
        }
    }
}

/// Counters collected during one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscodeStats {
    pub packets_read: u64,

    /// Packets belonging to other streams
    pub packets_skipped: u64,
    pub decode_calls: u64,
    pub frames_decoded: u64,
    pub converter_calls: u64,
    pub bytes_written: u64,

    /// `NotReady` results absorbed by retrying
    pub source_retries: u64,
    pub final_state: PipelineState,
}

impl TranscodeStats {
    /// Export stats as pretty JSON
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct PipelineOutput<W> {
    pub stats: TranscodeStats,

    /// Underlying writer, flushed
    pub writer: W,
}

/// Single-threaded transcoding pipeline
pub struct Pipeline<S, D, C, W: Write> {
    source: S,
    decoder: D,
    converter: C,
    sink: SinkWriter<W>,
    options: PipelineOptions,
    state: PipelineState,
    stats: TranscodeStats,
}

impl<S, D, C, W> Pipeline<S, D, C, W>
where
    S: PacketSource,
    D: FrameDecoder,
    C: FormatConverter,
    W: Write,
{
    /// Assemble a pipeline from already-initialized stages
    pub fn new(source: S, decoder: D, converter: C, sink: SinkWriter<W>, options: PipelineOptions) -> Self {
        Self {
            source,
            decoder,
            converter,
            sink,
            options,
            state: PipelineState::Init,
            stats: TranscodeStats::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run to completion.
    ///
    /// # Errors
    /// The first fatal error from any stage. Nothing is retried except a
    /// source reporting `NotReady`.
    pub fn run(mut self) -> Result<PipelineOutput<W>> {
        info!("Transcoding stream {}", self.options.stream_id);

        match self.stream().and_then(|_| self.drain()) {
            Ok(()) => {
                self.transition(PipelineState::Done);
                self.stats.bytes_written = self.sink.bytes_written();
                self.stats.final_state = self.state;

                info!(
                    "Transcode complete: {} packets ({} skipped), {} frames, {} bytes written",
                    self.stats.packets_read,
                    self.stats.packets_skipped,
                    self.stats.frames_decoded,
                    self.stats.bytes_written
                );

                let stats = self.stats;
                let writer = self.sink.finish()?;
                Ok(PipelineOutput { stats, writer })
            }
            Err(e) => {
                warn!("Pipeline failed while {}: {}", self.state, e);
                self.transition(PipelineState::Error);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("Pipeline state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn stream(&mut self) -> Result<()> {
        self.transition(PipelineState::Streaming);

        while let Some(packet) = self.pull()? {
            self.stats.packets_read += 1;

            if packet.stream_id != self.options.stream_id {
                trace!("Skipping packet of stream {}", packet.stream_id);
                self.stats.packets_skipped += 1;
                continue;
            }

            self.decode_packet(packet)?;
        }

        Ok(())
    }

    /// Pull the next packet, retrying `NotReady` under the retry policy.
    ///
    /// Returns `None` at end of stream.
    fn pull(&mut self) -> Result<Option<CompressedPacket>> {
        let retry = self.options.retry;
        let mut delays = retry.delays();
        let mut attempts = 0;

        loop {
            match self.source.next_packet()? {
                SourcePoll::Packet(packet) => return Ok(Some(packet)),
                SourcePoll::EndOfStream => return Ok(None),
                SourcePoll::NotReady => {
                    let Some(delay) = delays.next() else {
                        return Err(Error::SourceUnavailable { attempts });
                    };
                    attempts += 1;
                    self.stats.source_retries += 1;
                    trace!("Source not ready, retry {} in {:?}", attempts, delay);
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
            }
        }
    }

    /// Decode one packet until all of its bytes are consumed
    fn decode_packet(&mut self, mut packet: CompressedPacket) -> Result<()> {
        while !packet.is_exhausted() {
            let outcome = self.decoder.decode(&packet)?;
            self.stats.decode_calls += 1;

            if outcome.bytes_consumed == 0 {
                return Err(Error::DecoderStalled {
                    stream_id: packet.stream_id,
                    cursor: packet.cursor(),
                });
            }

            // An over-consuming call fails here, before its frame is written
            packet.advance(outcome.bytes_consumed)?;

            if let Some(frame) = outcome.frame {
                self.write_frame(&frame)?;
            }
        }

        Ok(())
    }

    fn write_frame(&mut self, frame: &RawAudioFrame) -> Result<()> {
        self.stats.frames_decoded += 1;
        let bytes = self.converter.convert(frame)?;
        self.stats.converter_calls += 1;
        self.sink.write_all(bytes)
    }

    fn drain(&mut self) -> Result<()> {
        self.transition(PipelineState::Draining);

        if self.options.flush_on_eos {
            while let Some(frame) = self.decoder.drain()? {
                self.write_frame(&frame)?;
            }
            let tail = self.converter.flush()?;
            self.sink.write_all(tail)?;
        } else {
            debug!("End-of-stream flush disabled, buffered frames are dropped");
        }

        self.sink.flush()
    }
}
