/*!
 * Stream Handles
 * Readable byte sources handed between filesystems
 */

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

enum Source {
    Seekable(Box<dyn SeekRead>),
    Pipe {
        reader: Box<dyn Read + Send>,
        consumed: u64,
    },
}

/// Owned readable stream
///
/// Seekable sources (files, in-memory buffers) can be rewound. Pipes only
/// track how many bytes have been consumed so far and are handed on as-is.
/// The underlying handle is closed when the stream is dropped.
pub struct Stream {
    source: Source,
}

impl Stream {
    pub fn seekable<R>(reader: R) -> Self
    where
        R: Read + Seek + Send + 'static,
    {
        Self {
            source: Source::Seekable(Box::new(reader)),
        }
    }

    pub fn pipe<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            source: Source::Pipe {
                reader: Box::new(reader),
                consumed: 0,
            },
        }
    }

    /// In-memory seekable stream over `bytes`
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::seekable(Cursor::new(bytes.into()))
    }

    #[must_use]
    pub fn is_seekable(&self) -> bool {
        matches!(self.source, Source::Seekable(_))
    }

    /// Current read offset
    pub fn position(&mut self) -> io::Result<u64> {
        match &mut self.source {
            Source::Seekable(reader) => reader.stream_position(),
            Source::Pipe { consumed, .. } => Ok(*consumed),
        }
    }

    /// Move a seekable stream back to offset 0
    ///
    /// Returns `false` without touching the stream when it is a pipe that
    /// has already been read from.
    pub fn rewind(&mut self) -> io::Result<bool> {
        match &mut self.source {
            Source::Seekable(reader) => {
                if reader.stream_position()? != 0 {
                    reader.seek(SeekFrom::Start(0))?;
                }
                Ok(true)
            }
            Source::Pipe { consumed, .. } => Ok(*consumed == 0),
        }
    }

    /// Drain the remaining bytes
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::Seekable(reader) => reader.read(buf),
            Source::Pipe { reader, consumed } => {
                let n = reader.read(buf)?;
                *consumed += n as u64;
                Ok(n)
            }
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("seekable", &self.is_seekable())
            .finish()
    }
}
