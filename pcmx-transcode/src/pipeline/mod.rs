//! Transcoding pipeline
//!
//! Single-threaded driver connecting the audio stages.

pub mod driver;
pub mod retry;

// Re-exports for external use (tests, binary)
pub use driver::{Pipeline, PipelineOptions, PipelineOutput, PipelineState, TranscodeStats};
pub use retry::RetryPolicy;
