//! Raw PCM output sink
//!
//! The output has no header: bytes are written exactly as the converter
//! emits them, in call order.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Byte-counting wrapper around any writer
pub struct SinkWriter<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl SinkWriter<BufWriter<File>> {
    /// Create (or truncate) the output file.
    ///
    /// # Errors
    /// `OpenSink` if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::OpenSink {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opened sink: {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SinkWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Write every byte of `buf`; a short write is an error.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush buffered bytes and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_written_in_order() {
        let mut sink = SinkWriter::new(Vec::new());
        sink.write_all(&[1, 2, 3]).unwrap();
        sink.write_all(&[]).unwrap();
        sink.write_all(&[4]).unwrap();

        assert_eq!(sink.bytes_written(), 4);
        assert_eq!(sink.finish().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_create_in_missing_directory() {
        let result = SinkWriter::create("/nonexistent/dir/out.pcm");
        assert!(matches!(result, Err(Error::OpenSink { .. })));
    }

    #[test]
    fn test_write_error_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut sink = SinkWriter::new(Broken);
        assert!(matches!(sink.write_all(&[0; 4]), Err(Error::Io(_))));
        assert_eq!(sink.bytes_written(), 0);
    }
}
