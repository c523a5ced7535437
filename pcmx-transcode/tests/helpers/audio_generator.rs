//! Audio test file generation utilities
//!
//! Generates deterministic 16-bit WAV files with known content, so the raw
//! PCM written by the transcoder can be compared against the exact samples
//! that went in.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Generated WAV file plus the interleaved samples it contains
pub struct TestWav {
    /// Keeps the directory alive for the test's duration
    pub dir: TempDir,
    pub path: PathBuf,
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl TestWav {
    /// Frames (samples per channel) in the file
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Path for an output file next to the input
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Samples as little-endian bytes, the layout of raw S16LE output
    pub fn le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Generate a sine wave WAV, identical on every channel
///
/// # Arguments
/// * `frames` - Samples per channel
/// * `frequency_hz` - Sine wave frequency in Hz (e.g., 440.0 for A4)
/// * `amplitude` - Amplitude 0.0-1.0
pub fn generate_sine_wav(
    channels: u16,
    sample_rate: u32,
    frames: usize,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<TestWav, hound::Error> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sine.wav");

    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = (2.0 * PI * frequency_hz * t).sin() * amplitude;
        let sample = (value * i16::MAX as f32) as i16;
        samples.extend(std::iter::repeat(sample).take(channels as usize));
    }

    write_wav(&path, channels, sample_rate, &samples)?;
    Ok(TestWav {
        dir,
        path,
        samples,
        channels,
        sample_rate,
    })
}

/// Generate a WAV whose channels hold distinct ramps, so channel order and
/// sample order can both be checked byte for byte
pub fn generate_stepped_wav(channels: u16, sample_rate: u32, frames: usize) -> Result<TestWav, hound::Error> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stepped.wav");

    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        for c in 0..channels {
            let value = (i as i32 * 7 + c as i32 * 1000) % 30000 - 15000;
            samples.push(value as i16);
        }
    }

    write_wav(&path, channels, sample_rate, &samples)?;
    Ok(TestWav {
        dir,
        path,
        samples,
        channels,
        sample_rate,
    })
}
