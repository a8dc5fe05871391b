//! Synchronous byte streams.
//!
//! # Example
//!
//! ```
//! use taolst::transport::{ByteSink, ByteSource, ReaderSource};
//!
//! let mut source = ReaderSource::new(&[0x22u8, 0x69][..]);
//! assert_eq!(source.next_byte().unwrap(), Some(0x22));
//! assert_eq!(source.next_byte().unwrap(), Some(0x69));
//! assert_eq!(source.next_byte().unwrap(), None);
//!
//! let mut sink = Vec::new();
//! sink.write_bytes(&[1, 2, 3]).unwrap();
//! assert_eq!(sink, [1, 2, 3]);
//! ```

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TaolstError};

/// File name prefix of replay output.
pub const REPLY_PREFIX: &str = "reply-";

/// Receive path: yields one byte at a time.
pub trait ByteSource {
    /// Next byte, or `None` at end of stream.
    fn next_byte(&mut self) -> Result<Option<u8>>;
}

/// Transmit path: accepts whole encoded frames.
pub trait ByteSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

impl<W: Write> ByteSink for W {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        Ok(())
    }
}

/// Buffered [`ByteSource`] over any reader.
pub struct ReaderSource<R> {
    inner: BufReader<R>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = match self.inner.fill_buf()?.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        self.inner.consume(1);
        Ok(Some(byte))
    }
}

/// Output path for the replies to capture file `src`: `dst_dir/reply-<file name>`.
pub fn reply_path(src: impl AsRef<Path>, dst_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let src = src.as_ref();
    let name = src.file_name().ok_or_else(|| {
        TaolstError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("capture path has no file name: {}", src.display()),
        ))
    })?;

    let mut file_name = std::ffi::OsString::from(REPLY_PREFIX);
    file_name.push(name);
    Ok(dst_dir.as_ref().join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn test_reader_source_drains() {
        let data: Vec<u8> = (0..=255).collect();
        let mut source = ReaderSource::new(data.as_slice());

        let mut out = Vec::new();
        while let Some(b) = source.next_byte().unwrap() {
            out.push(b);
        }
        assert_eq!(out, data);
        assert_eq!(source.next_byte().unwrap(), None);
    }

    #[test]
    fn test_reader_source_error() {
        let mut source = ReaderSource::new(FailingReader);
        assert!(matches!(source.next_byte(), Err(TaolstError::Io(_))));
    }

    #[test]
    fn test_write_sink_appends() {
        let mut sink = Vec::new();
        sink.write_bytes(&[0x22, 0x69]).unwrap();
        sink.write_bytes(&[0x06]).unwrap();
        assert_eq!(sink, [0x22, 0x69, 0x06]);
    }

    #[test]
    fn test_reply_path() {
        let path = reply_path("/captures/ping.bin", "/out").unwrap();
        assert_eq!(path, PathBuf::from("/out/reply-ping.bin"));
    }

    #[test]
    fn test_reply_path_without_file_name() {
        assert!(reply_path("/", "/out").is_err());
    }
}
