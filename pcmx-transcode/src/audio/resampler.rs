//! Streaming sample rate conversion using rubato
//!
//! Frames arrive in whatever sizes the decoder produces, while rubato's
//! fixed-input resamplers need exactly `input_frames_next()` frames per call.
//! [`RateConverter`] buffers input per channel and runs the resampler whenever
//! a full chunk is available, carrying the remainder to the next call.
//!
//! The resampler's start-up delay is trimmed from the output, and `flush`
//! pads the tail so the total output length matches the rate ratio.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Stateful planar f32 resampler
pub struct RateConverter {
    resampler: FastFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,

    /// Input frames not yet handed to the resampler, one Vec per channel
    pending: Vec<Vec<f32>>,

    /// Output frames still to discard as resampler latency
    delay_remaining: usize,

    frames_in: u64,
    frames_out: u64,
}

impl RateConverter {
    /// Create a converter for `channels` planar channels.
    ///
    /// `chunk_size` is the resampler's fixed input block, normally the codec's
    /// nominal frame size.
    pub fn new(input_rate: u32, output_rate: u32, channels: usize, chunk_size: usize) -> Result<Self> {
        let resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // no runtime ratio changes
            PolynomialDegree::Septic,
            chunk_size,
            channels,
        )
        .map_err(|e| Error::Allocation(format!("Failed to create resampler: {}", e)))?;

        let delay_remaining = resampler.output_delay();

        debug!(
            "Resampler {}Hz -> {}Hz, {} channels, chunk {} frames, delay {} frames",
            input_rate, output_rate, channels, chunk_size, delay_remaining
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            pending: vec![Vec::with_capacity(chunk_size * 2); channels],
            delay_remaining,
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Upper bound on output frames produced by one `process` call fed
    /// `input_frames` frames
    pub fn max_output_frames(&self, input_frames: usize) -> usize {
        let chunk = self.resampler.input_frames_max().max(1);
        let chunks = (self.pending_frames() + input_frames) / chunk + 1;
        chunks * self.resampler.output_frames_max()
    }

    /// Feed planar input; completed output is appended to `output`.
    pub fn process(&mut self, input: &[Vec<f32>], output: &mut [Vec<f32>]) -> Result<()> {
        for (pending, channel) in self.pending.iter_mut().zip(input) {
            pending.extend_from_slice(channel);
        }
        self.frames_in += input.first().map_or(0, |c| c.len()) as u64;

        loop {
            let needed = self.resampler.input_frames_next();
            if self.pending_frames() < needed {
                break;
            }

            let resampled = {
                let chunk: Vec<&[f32]> = self.pending.iter().map(|c| &c[..needed]).collect();
                self.resampler
                    .process(&chunk, None)
                    .map_err(|e| Error::Convert(format!("Resampling failed: {}", e)))?
            };

            for pending in self.pending.iter_mut() {
                pending.drain(..needed);
            }
            self.emit(resampled, output, None);
        }

        Ok(())
    }

    /// Push out buffered input and the resampler's delay line.
    ///
    /// After this call the total output length equals the input length scaled
    /// by the rate ratio, rounded to the nearest frame.
    pub fn flush(&mut self, output: &mut [Vec<f32>]) -> Result<()> {
        let expected = (self.frames_in * self.output_rate as u64 + self.input_rate as u64 / 2)
            / self.input_rate as u64;

        if self.pending_frames() > 0 {
            let resampled = self
                .resampler
                .process_partial(Some(self.pending.as_slice()), None)
                .map_err(|e| Error::Convert(format!("Resampling failed: {}", e)))?;
            for pending in self.pending.iter_mut() {
                pending.clear();
            }
            self.emit(resampled, output, Some(expected));
        }

        // Zero-padded calls until the delay line has drained. Each call yields
        // about `chunk * ratio` frames, so the missing frames plus the unread
        // delay bound the number of calls.
        let missing = expected.saturating_sub(self.frames_out) as f64 + self.delay_remaining as f64;
        let per_call = self.resampler.input_frames_max().max(1) as f64 * self.output_rate as f64
            / self.input_rate as f64;
        let max_calls = (missing / per_call).ceil() as usize + 4;

        let mut calls = 0;
        while self.frames_out < expected && calls < max_calls {
            let resampled = self
                .resampler
                .process_partial::<Vec<f32>>(None, None)
                .map_err(|e| Error::Convert(format!("Resampling failed: {}", e)))?;
            self.emit(resampled, output, Some(expected));
            calls += 1;
        }

        debug!(
            "Resampler flushed: {} frames in, {} frames out",
            self.frames_in, self.frames_out
        );
        Ok(())
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.first().map_or(0, |c| c.len())
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Append resampled frames, skipping remaining latency and stopping at `limit`
    fn emit(&mut self, resampled: Vec<Vec<f32>>, output: &mut [Vec<f32>], limit: Option<u64>) {
        let produced = resampled.first().map_or(0, |c| c.len());
        let skip = self.delay_remaining.min(produced);
        self.delay_remaining -= skip;

        let mut take = produced - skip;
        if let Some(limit) = limit {
            take = take.min(limit.saturating_sub(self.frames_out) as usize);
        }

        for (out, channel) in output.iter_mut().zip(&resampled) {
            out.extend_from_slice(&channel[skip..skip + take]);
        }
        self.frames_out += take as u64;
    }
}
