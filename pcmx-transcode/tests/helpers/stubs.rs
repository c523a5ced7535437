//! Scripted pipeline stages
//!
//! Each stub replays a fixed script and records what the pipeline asked of it,
//! so tests can assert on call counts and ordering without real media.

use pcmx_transcode::audio::{
    CodecParameters, CompressedPacket, DecodeOutcome, FormatConverter, FrameDecoder,
    PacketSource, RawAudioFrame, SourcePoll, StreamDescriptor,
};
use pcmx_transcode::Result;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Counts drops of the stage that owns it
#[derive(Debug, Clone, Default)]
pub struct DropCounter(Rc<Cell<u32>>);

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.0.get()
    }

    /// Token to embed in a stage; its drop increments the shared count
    pub fn token(&self) -> DropToken {
        DropToken(self.0.clone())
    }
}

pub struct DropToken(Rc<Cell<u32>>);

impl Drop for DropToken {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Packet of `len` bytes for `stream_id`
pub fn packet(stream_id: u32, len: usize) -> SourcePoll {
    SourcePoll::Packet(CompressedPacket::new(stream_id, vec![0xAB; len], Some(0)))
}

/// 44.1 kHz stereo S16P frame; every sample carries `marker`
pub fn stereo_frame(samples: usize, marker: i16) -> RawAudioFrame {
    RawAudioFrame::from_s16_planar(44100, &[vec![marker; samples], vec![marker; samples]])
}

/// Source replaying a fixed sequence of poll results, then end of stream
pub struct ScriptedSource {
    streams: Vec<StreamDescriptor>,
    script: VecDeque<SourcePoll>,
    pub polls: Rc<Cell<u32>>,
    _drop: Option<DropToken>,
}

impl ScriptedSource {
    /// Single audio stream with id `stream_id`
    pub fn new(stream_id: u32, script: Vec<SourcePoll>) -> Self {
        Self {
            streams: vec![StreamDescriptor::audio(stream_id, CodecParameters::default())],
            script: script.into(),
            polls: Rc::new(Cell::new(0)),
            _drop: None,
        }
    }

    pub fn with_drop_counter(mut self, counter: &DropCounter) -> Self {
        self._drop = Some(counter.token());
        self
    }
}

impl PacketSource for ScriptedSource {
    fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    fn next_packet(&mut self) -> Result<SourcePoll> {
        self.polls.set(self.polls.get() + 1);
        Ok(self.script.pop_front().unwrap_or(SourcePoll::EndOfStream))
    }
}

/// One scripted decoder response
#[derive(Debug, Clone)]
pub enum DecodeStep {
    /// Consume bytes without producing a frame
    Consume(usize),

    /// Consume bytes and produce a frame of `samples` samples tagged `marker`
    Frame {
        consumed: usize,
        samples: usize,
        marker: i16,
    },

    /// Consume whatever remains and produce a frame
    FrameRest { samples: usize, marker: i16 },
}

/// Decoder replaying scripted responses; an empty script consumes the rest
pub struct ScriptedDecoder {
    steps: VecDeque<DecodeStep>,
    drain: VecDeque<RawAudioFrame>,
    pub calls: Rc<Cell<u32>>,
    _drop: Option<DropToken>,
}

impl ScriptedDecoder {
    pub fn new(steps: Vec<DecodeStep>) -> Self {
        Self {
            steps: steps.into(),
            drain: VecDeque::new(),
            calls: Rc::new(Cell::new(0)),
            _drop: None,
        }
    }

    /// Frames returned by `drain` at end of stream
    pub fn with_buffered(mut self, frames: Vec<RawAudioFrame>) -> Self {
        self.drain = frames.into();
        self
    }

    pub fn with_drop_counter(mut self, counter: &DropCounter) -> Self {
        self._drop = Some(counter.token());
        self
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn decode(&mut self, packet: &CompressedPacket) -> Result<DecodeOutcome> {
        self.calls.set(self.calls.get() + 1);
        let remaining = packet.remaining().len();

        Ok(match self.steps.pop_front() {
            Some(DecodeStep::Consume(n)) => DecodeOutcome::consumed(n),
            Some(DecodeStep::Frame {
                consumed,
                samples,
                marker,
            }) => DecodeOutcome::produced(stereo_frame(samples, marker), consumed),
            Some(DecodeStep::FrameRest { samples, marker }) => {
                DecodeOutcome::produced(stereo_frame(samples, marker), remaining)
            }
            None => DecodeOutcome::consumed(remaining),
        })
    }

    fn drain(&mut self) -> Result<Option<RawAudioFrame>> {
        Ok(self.drain.pop_front())
    }
}

/// Converter recording each frame's marker and emitting 4 bytes per sample
pub struct RecordingConverter {
    pub seen: Rc<RefCell<Vec<i16>>>,
    out: Vec<u8>,
    _drop: Option<DropToken>,
}

impl RecordingConverter {
    pub fn new() -> Self {
        Self {
            seen: Rc::new(RefCell::new(Vec::new())),
            out: Vec::new(),
            _drop: None,
        }
    }

    pub fn with_drop_counter(mut self, counter: &DropCounter) -> Self {
        self._drop = Some(counter.token());
        self
    }
}

impl FormatConverter for RecordingConverter {
    fn convert(&mut self, frame: &RawAudioFrame) -> Result<&[u8]> {
        let marker = i16::from_le_bytes([frame.planes[0][0], frame.planes[0][1]]);
        self.seen.borrow_mut().push(marker);
        self.out = vec![0; frame.sample_count * 4];
        Ok(&self.out)
    }
}
