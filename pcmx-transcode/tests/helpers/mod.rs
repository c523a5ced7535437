//! Test helper modules for pcmx integration tests
//!
//! Provides reusable test infrastructure components:
//! - Scripted stages: source, decoder and converter driven by a fixed script
//! - Audio generator: deterministic WAV fixtures written with hound

#![allow(dead_code)]

pub mod audio_generator;
pub mod stubs;

// Re-export commonly used types
pub use audio_generator::{generate_sine_wav, generate_stepped_wav, TestWav};
pub use stubs::{
    packet, stereo_frame, DecodeStep, DropCounter, RecordingConverter, ScriptedDecoder,
    ScriptedSource,
};
