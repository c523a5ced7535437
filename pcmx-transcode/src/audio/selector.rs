//! Audio stream selection
//!
//! Only one audio stream is transcoded. The first audio entry of the stream
//! table wins; any later audio stream is ignored.

use super::types::{MediaType, StreamDescriptor};
use crate::error::{Error, Result};
use tracing::debug;

/// Return the index of the first audio stream in `streams`.
///
/// # Errors
/// `NoAudioStreamFound` when no entry is audio.
pub fn select_audio_stream(streams: &[StreamDescriptor]) -> Result<usize> {
    let index = streams
        .iter()
        .position(|s| s.media_type == MediaType::Audio)
        .ok_or(Error::NoAudioStreamFound)?;

    let ignored = streams[index + 1..]
        .iter()
        .filter(|s| s.media_type == MediaType::Audio)
        .count();
    if ignored > 0 {
        debug!("Ignoring {} additional audio stream(s)", ignored);
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::CodecParameters;

    fn audio(id: u32) -> StreamDescriptor {
        StreamDescriptor::audio(id, CodecParameters::default())
    }

    #[test]
    fn test_first_audio_wins() {
        let streams = vec![audio(0), StreamDescriptor::other(1), audio(2)];
        assert_eq!(select_audio_stream(&streams).unwrap(), 0);
    }

    #[test]
    fn test_audio_after_other_streams() {
        let streams = vec![StreamDescriptor::other(0), StreamDescriptor::other(1), audio(2)];
        assert_eq!(select_audio_stream(&streams).unwrap(), 2);
    }

    #[test]
    fn test_no_audio_stream() {
        let streams = vec![StreamDescriptor::other(0)];
        assert!(matches!(
            select_audio_stream(&streams),
            Err(Error::NoAudioStreamFound)
        ));
    }

    #[test]
    fn test_empty_stream_table() {
        assert!(matches!(
            select_audio_stream(&[]),
            Err(Error::NoAudioStreamFound)
        ));
    }
}
