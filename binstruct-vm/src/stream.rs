//! Seekable byte sources the interpreter reads fields from.
//!
//! Three implementations cover the shapes a caller is likely to hand in: an owned buffer, a
//! borrowed slice, and a buffered file. All three share the same `tell`/`seek`/`read`/`peek`
//! vocabulary so the interpreter never needs to know which one it's holding.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use binstruct_format::SeekMode;

use crate::error::{Error, ErrorKind, Result};

/// A seekable source of bytes to parse fields from.
pub trait Stream {
    /// Read exactly `len` bytes, advancing the cursor.
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Read exactly `len` bytes without advancing the cursor.
    fn peek(&mut self, len: usize) -> Result<Vec<u8>> {
        let start = self.tell();
        let bytes = self.read(len)?;
        self.seek(start as i64, SeekMode::Absolute)?;
        Ok(bytes)
    }

    /// Current cursor offset from the start of the stream.
    fn tell(&self) -> u64;

    /// Move the cursor per `mode`, returning the new absolute offset.
    fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64>;
}

fn unexpected_end(requested: usize, available: usize) -> Error {
    Error::new(ErrorKind::UnexpectedEnd {
        requested,
        available,
    })
}

/// Resolves a seek offset/mode into an absolute target position. Seeking past the end of the
/// stream is permitted here — only a negative target is rejected; a subsequent read past the end
/// fails on its own with `UnexpectedEnd`.
fn resolve_target(offset: i64, mode: SeekMode, current: u64, len: u64) -> Result<u64> {
    let base = match mode {
        SeekMode::Absolute => 0i64,
        SeekMode::Relative => current as i64,
        SeekMode::FromEnd => len as i64,
    };
    let target = base.checked_add(offset).ok_or(Error::new(ErrorKind::InvalidSeek))?;
    if target < 0 {
        return Err(Error::new(ErrorKind::InvalidSeek));
    }
    Ok(target as u64)
}

/// An in-memory stream over an owned buffer.
#[derive(Debug, Clone)]
pub struct ByteBufferStream {
    buffer: Vec<u8>,
    pos: usize,
}

impl ByteBufferStream {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer, pos: 0 }
    }
}

impl Stream for ByteBufferStream {
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let end = self.pos.checked_add(len).ok_or(unexpected_end(len, 0))?;
        if end > self.buffer.len() {
            return Err(unexpected_end(len, self.buffer.len() - self.pos));
        }
        let bytes = self.buffer[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64> {
        let target = resolve_target(offset, mode, self.pos as u64, self.buffer.len() as u64)?;
        self.pos = target as usize;
        Ok(target)
    }
}

/// A stream borrowing a byte slice, for zero-copy parsing of already-loaded data.
#[derive(Debug, Clone, Copy)]
pub struct SliceStream<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceStream<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl Stream for SliceStream<'_> {
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let end = self.pos.checked_add(len).ok_or(unexpected_end(len, 0))?;
        if end > self.bytes.len() {
            return Err(unexpected_end(len, self.bytes.len() - self.pos));
        }
        let bytes = self.bytes[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64> {
        let target = resolve_target(offset, mode, self.pos as u64, self.bytes.len() as u64)?;
        self.pos = target as usize;
        Ok(target)
    }
}

/// A stream over a buffered file, for parsing without loading the whole file into memory.
pub struct BufferedFileStream {
    reader: BufReader<File>,
    pos: u64,
    len: u64,
}

impl BufferedFileStream {
    pub fn open(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            pos: 0,
            len,
        })
    }
}

impl Stream for BufferedFileStream {
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                let available = (self.len - self.pos) as usize;
                unexpected_end(len, available)
            } else {
                Error::new(ErrorKind::Io(err.to_string()))
            }
        })?;
        self.pos += len as u64;
        Ok(buf)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64> {
        let target = resolve_target(offset, mode, self.pos, self.len)?;
        let new_pos = self
            .reader
            .seek(SeekFrom::Start(target))
            .map_err(|err| Error::new(ErrorKind::Io(err.to_string())))?;
        self.pos = new_pos;
        Ok(new_pos)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slice_stream_reads_and_advances() {
        let mut stream = SliceStream::new(&[1, 2, 3, 4]);
        assert_eq!(stream.read(2).unwrap(), vec![1, 2]);
        assert_eq!(stream.tell(), 2);
        assert_eq!(stream.read(2).unwrap(), vec![3, 4]);
    }

    #[test]
    fn slice_stream_peek_does_not_advance() {
        let mut stream = SliceStream::new(&[1, 2, 3, 4]);
        assert_eq!(stream.peek(2).unwrap(), vec![1, 2]);
        assert_eq!(stream.tell(), 0);
    }

    #[test]
    fn slice_stream_read_past_end_fails() {
        let mut stream = SliceStream::new(&[1, 2]);
        let err = stream.read(3).unwrap_err();
        assert_eq!(
            *err.kind(),
            ErrorKind::UnexpectedEnd {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn seek_modes() {
        let mut stream = ByteBufferStream::new(vec![0; 10]);
        assert_eq!(stream.seek(4, SeekMode::Absolute).unwrap(), 4);
        assert_eq!(stream.seek(2, SeekMode::Relative).unwrap(), 6);
        assert_eq!(stream.seek(-3, SeekMode::FromEnd).unwrap(), 7);
    }

    #[test]
    fn seek_past_end_succeeds_but_negative_seek_fails() {
        let mut stream = ByteBufferStream::new(vec![0; 4]);
        assert_eq!(stream.seek(10, SeekMode::Absolute).unwrap(), 10);
        assert!(stream.read(1).is_err());
        assert!(stream.seek(-1, SeekMode::Absolute).is_err());
    }
}
