//! Offset-translating readers and writers over a sub-region of a file.
//!
//! The embedded container lives in the middle of a larger file: after the
//! original binary and before the trailer. The adapters in this module let
//! the container reader and writer work as if the container were a file of
//! its own, without copying it out.
//!
//! ```text
//! file:    [ original binary ][ container ........ ][ trailer ]
//!                             ^ base                ^ base + len
//! region:                     [ 0 ............ len )
//! ```
//!
//! Reads go through [`ReadAt`], a positional read that does not touch any
//! shared cursor. That is what lets several entry streams read the same open
//! file at once.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

/// Random-access, positional reads.
///
/// Implementations must not depend on (or move) a shared cursor, so a single
/// source can serve many readers concurrently.
pub trait ReadAt {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read; `0` means `offset` is at or past the
    /// end of the source.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(buf, offset) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "failed to fill whole buffer",
                    ));
                }
                Ok(n) => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl ReadAt for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    // seek_read moves the handle's cursor, but nothing here relies on it.
    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }

    #[cfg(not(any(unix, windows)))]
    fn read_at(&self, _buf: &mut [u8], _offset: u64) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "positional reads are not supported on this platform",
        ))
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let len = self.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

/// A `Read + Seek` view of `len` bytes of a source, starting at `base`.
///
/// Logical offset `o` maps to `base + o` in the source. Reads stop at the end
/// of the region even if the source continues.
#[derive(Debug, Clone)]
pub struct RegionReader<S> {
    source: S,
    base: u64,
    len: u64,
    pos: u64,
}

impl<S: ReadAt> RegionReader<S> {
    /// Creates a reader over `source[base..base + len]`.
    pub fn new(source: S, base: u64, len: u64) -> Self {
        Self {
            source,
            base,
            len,
            pos: 0,
        }
    }

    /// Returns the offset of the region within the source.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Returns the length of the region.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the region is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the reader, returning the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: ReadAt> ReadAt for RegionReader<S> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let remaining = self.len - offset;
        let max = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        self.source.read_at(&mut buf[..max], self.base + offset)
    }
}

impl<S: ReadAt> Read for RegionReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = ReadAt::read_at(self, buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: ReadAt> Seek for RegionReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

/// A `Write + Seek` view of a sink where offset `0` is `base`.
///
/// Everything before `base` is out of reach: seeking there fails.
#[derive(Debug)]
pub struct RegionWriter<W> {
    inner: W,
    base: u64,
}

impl<W: Write + Seek> RegionWriter<W> {
    /// Creates a writer whose logical offset `0` is `base`, and moves the
    /// underlying cursor there.
    pub fn new(mut inner: W, base: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(base))?;
        Ok(Self { inner, base })
    }

    /// Returns the offset of the region within the sink.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Returns a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consumes the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for RegionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Seek> Seek for RegionWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let absolute = match pos {
            SeekFrom::Start(n) => {
                let n = self.base.checked_add(n).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek position overflows")
                })?;
                self.inner.seek(SeekFrom::Start(n))?
            }
            other => self.inner.seek(other)?,
        };
        absolute.checked_sub(self.base).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the region",
            )
        })
    }
}
