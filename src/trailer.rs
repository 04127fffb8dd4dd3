//! The fixed-size trailer that marks a binary as carrying embedded files.
//!
//! Layout of the last [`TRAILER_LEN`] bytes of an archived binary:
//!
//! ```text
//! Offset  Size  Field
//! 0       8     original_size (u64 BE) - where the original binary ends
//! 8       3     marker ("GAR")
//! ```
//!
//! The container occupies `original_size .. file_len - TRAILER_LEN`.

use crate::region::ReadAt;
use crate::{Error, Result};

/// Marker bytes identifying an archived binary.
pub const MARKER: &[u8; 3] = b"GAR";

/// Trailer size in bytes (fixed).
pub const TRAILER_LEN: usize = 8 + MARKER.len();

/// The decoded trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Length of the binary before the container was appended.
    pub original_size: u64,
}

impl Trailer {
    /// Creates a trailer for a binary that was `original_size` bytes long.
    pub fn new(original_size: u64) -> Self {
        Self { original_size }
    }

    /// Serialize trailer to bytes.
    pub fn encode(&self) -> [u8; TRAILER_LEN] {
        let mut buf = [0u8; TRAILER_LEN];
        buf[..8].copy_from_slice(&self.original_size.to_be_bytes());
        buf[8..].copy_from_slice(MARKER);
        buf
    }

    /// Deserialize trailer from bytes.
    pub fn decode(buf: &[u8; TRAILER_LEN]) -> Result<Self> {
        if &buf[8..] != MARKER {
            return Err(Error::invalid_format(format!(
                "file does not end with marker {:?}",
                String::from_utf8_lossy(MARKER)
            )));
        }
        let mut size = [0u8; 8];
        size.copy_from_slice(&buf[..8]);
        Ok(Self {
            original_size: u64::from_be_bytes(size),
        })
    }
}

/// Byte range of the embedded container within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailRegion {
    /// Where the original binary ends and the container begins.
    pub start: u64,
    /// Where the container ends and the trailer begins.
    pub end: u64,
}

impl TailRegion {
    /// Returns the size of the embedded container in bytes.
    ///
    /// An inverted region (`start > end`) has length zero.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the container is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locates the embedded container from the tail of a source of `file_len` bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] if the source is shorter than the trailer,
/// if it does not end with the marker, or if the recorded size points past the
/// start of the trailer.
pub fn locate<S: ReadAt + ?Sized>(source: &S, file_len: u64) -> Result<TailRegion> {
    let trailer_len = TRAILER_LEN as u64;
    let end = file_len.checked_sub(trailer_len).ok_or_else(|| {
        Error::invalid_format(format!(
            "file is {} bytes, shorter than the {}-byte trailer",
            file_len, TRAILER_LEN
        ))
    })?;

    let mut buf = [0u8; TRAILER_LEN];
    source.read_exact_at(&mut buf, end).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::invalid_format("truncated trailer")
        } else {
            Error::Io(e)
        }
    })?;

    let trailer = Trailer::decode(&buf)?;
    if trailer.original_size > end {
        return Err(Error::invalid_format(format!(
            "recorded binary size {} exceeds container end {}",
            trailer.original_size, end
        )));
    }

    log::debug!(
        "located embedded container at {}..{} ({} bytes)",
        trailer.original_size,
        end,
        end - trailer.original_size
    );

    Ok(TailRegion {
        start: trailer.original_size,
        end,
    })
}
