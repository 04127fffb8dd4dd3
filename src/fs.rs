//! Filesystem-style, read-only access to an embedded container.
//!
//! A [`FileSystem`] is built once from a file that ends with a trailer: the
//! trailer is located, the container directory is parsed, and the entries are
//! indexed by name. After that the directory never changes. Only the open
//! file handle has a lifecycle, and it is guarded by a lock so lookups from
//! many threads never race with [`FileSystem::close`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::io::Read;
//! use gar::FileSystem;
//!
//! let fs = FileSystem::open_path("./app")?;
//! println!("binary is {} bytes", fs.binary_size());
//!
//! for info in fs.list() {
//!     println!("{} => {}", info.name, info.size);
//! }
//!
//! let mut file = fs.open("cfg/a.txt")?;
//! let mut text = String::new();
//! file.read_to_string(&mut text)?;
//! fs.close()?;
//! # Ok::<(), gar::Error>(())
//! ```
//!
//! # Streams and `close`
//!
//! Every [`EmbeddedFile`] shares ownership of the handle it reads from, so a
//! stream opened before `close` stays readable until it is dropped. New
//! opens after `close` fail with [`Error::Closed`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use flate2::read::DeflateDecoder;

use crate::region::{ReadAt, RegionReader};
use crate::trailer::{self, TailRegion};
use crate::{Error, Result};

/// Offset of the general purpose flags in a local file header.
const LOCAL_HEADER_FLAGS_OFFSET: u64 = 6;

/// Name and uncompressed size of one embedded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileInfo {
    /// Slash-separated relative path, unique within the container.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Method {
    Stored,
    Deflated,
    Other(String),
}

/// Everything needed to open a decoding stream for one entry.
#[derive(Debug, Clone)]
struct Slot {
    info: FileInfo,
    /// Offset of the entry data, relative to the start of the container.
    data_start: u64,
    compressed_size: u64,
    crc32: u32,
    method: Method,
    encrypted: bool,
}

/// Read-only view over the files embedded at the tail of a binary.
///
/// `FileSystem` is `Send + Sync` when its source is, so it can be shared
/// behind an `Arc` (or a `static`) and read from many threads.
pub struct FileSystem<S = File> {
    region: TailRegion,
    entries: HashMap<String, Slot>,
    source: RwLock<Option<Arc<S>>>,
}

impl FileSystem<File> {
    /// Opens the binary at `path` and indexes its embedded container.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be opened
    /// - [`Error::InvalidFormat`] if it carries no valid trailer
    /// - [`Error::Zip`] if the container directory is damaged
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        log::debug!("opening embedded file system in '{}'", path.display());
        Self::from_source(file, len)
    }
}

impl<S: ReadAt> FileSystem<S> {
    /// Indexes the container embedded in `source`, a blob of `len` bytes.
    pub fn from_source(source: S, len: u64) -> Result<Self> {
        let region = trailer::locate(&source, len)?;
        let source = Arc::new(source);
        let entries = read_directory(&source, region)?;
        log::debug!("indexed {} embedded entries", entries.len());

        Ok(Self {
            region,
            entries,
            source: RwLock::new(Some(source)),
        })
    }

    /// Returns the length of the original binary, before the container.
    pub fn binary_size(&self) -> u64 {
        self.region.start
    }

    /// Returns the byte range of the container within the file.
    pub fn region(&self) -> TailRegion {
        self.region
    }

    /// Returns the number of embedded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the container holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an entry with exactly this name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns name and size of the entry, if it exists.
    pub fn metadata(&self, name: &str) -> Option<&FileInfo> {
        self.entries.get(name).map(|slot| &slot.info)
    }

    /// Lists all embedded entries. Order is unspecified.
    pub fn list(&self) -> Vec<FileInfo> {
        self.entries.values().map(|slot| slot.info.clone()).collect()
    }

    /// Opens a stream over the decompressed bytes of one entry.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] after [`close`](Self::close)
    /// - [`Error::EntryNotFound`] if no entry has this exact name
    /// - [`Error::UnsupportedMethod`] / [`Error::UnsupportedFeature`] for
    ///   entries that are neither stored nor deflated, or are encrypted
    pub fn open(&self, name: &str) -> Result<EmbeddedFile<S>> {
        let source = {
            let guard = read_handle(&self.source);
            match guard.as_ref() {
                Some(source) => Arc::clone(source),
                None => return Err(Error::Closed),
            }
        };

        let slot = self.entries.get(name).ok_or_else(|| Error::EntryNotFound {
            path: name.to_string(),
        })?;

        if slot.encrypted {
            return Err(Error::UnsupportedFeature {
                path: slot.info.name.clone(),
                feature: "encrypted entries",
            });
        }

        let raw = RegionReader::new(
            source,
            self.region.start + slot.data_start,
            slot.compressed_size,
        );
        let decoder = match &slot.method {
            Method::Stored => Decoder::Stored(raw),
            Method::Deflated => Decoder::Deflated(DeflateDecoder::new(raw)),
            Method::Other(method) => {
                return Err(Error::UnsupportedMethod {
                    path: slot.info.name.clone(),
                    method: method.clone(),
                });
            }
        };

        Ok(EmbeddedFile {
            info: slot.info.clone(),
            decoder,
            expected_crc: slot.crc32,
            hasher: crc32fast::Hasher::new(),
            bytes_read: 0,
            verified: false,
        })
    }

    /// Reads a whole entry into memory.
    pub fn read_to_vec(&self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.open(name)?;
        let capacity = usize::try_from(file.size()).unwrap_or(0).min(1 << 24);
        let mut data = Vec::with_capacity(capacity);
        file.read_to_end(&mut data).map_err(Error::from_io)?;
        Ok(data)
    }

    /// Releases the file handle.
    ///
    /// Streams that are still open keep their own reference to the handle
    /// and remain readable. Closing twice fails with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut guard = write_handle(&self.source);
        match guard.take() {
            Some(_) => Ok(()),
            None => Err(Error::Closed),
        }
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        read_handle(&self.source).is_none()
    }
}

impl<S> std::fmt::Debug for FileSystem<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("region", &self.region)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

/// Acquires the handle lock for reading, recovering from a poisoned state.
///
/// The guarded value is only ever replaced wholesale, so it cannot be
/// observed half-updated.
fn read_handle<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        log::warn!("file handle lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

fn write_handle<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log::warn!("file handle lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Parses the container directory into a name-indexed map.
///
/// Later records replace earlier ones with the same name.
fn read_directory<S: ReadAt>(
    source: &Arc<S>,
    region: TailRegion,
) -> Result<HashMap<String, Slot>> {
    let reader = RegionReader::new(Arc::clone(source), region.start, region.len());
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut entries = HashMap::with_capacity(archive.len());

    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        let method = match file.compression() {
            zip::CompressionMethod::Stored => Method::Stored,
            zip::CompressionMethod::Deflated => Method::Deflated,
            other => Method::Other(format!("{:?}", other)),
        };
        let slot = Slot {
            info: FileInfo {
                name: file.name().to_string(),
                size: file.size(),
            },
            data_start: file.data_start(),
            compressed_size: file.compressed_size(),
            crc32: file.crc32(),
            method,
            encrypted: false,
        };
        let header_start = file.header_start();
        drop(file);

        let slot = Slot {
            encrypted: is_encrypted(&**source, region.start + header_start)?,
            ..slot
        };
        if let Some(previous) = entries.insert(slot.info.name.clone(), slot) {
            log::debug!("duplicate entry '{}' replaced", previous.info.name);
        }
    }

    Ok(entries)
}

/// Reads bit 0 (encrypted) of a local header's general purpose flags.
fn is_encrypted<S: ReadAt + ?Sized>(source: &S, header_start: u64) -> Result<bool> {
    let mut flags = [0u8; 2];
    source
        .read_exact_at(&mut flags, header_start + LOCAL_HEADER_FLAGS_OFFSET)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::invalid_format("local header extends past the container")
            } else {
                Error::Io(e)
            }
        })?;
    Ok(u16::from_le_bytes(flags) & 1 != 0)
}

enum Decoder<S> {
    Stored(RegionReader<Arc<S>>),
    Deflated(DeflateDecoder<RegionReader<Arc<S>>>),
}

/// A readable stream over one embedded file.
///
/// The stream verifies the recorded size and CRC-32 once the data is
/// exhausted; a mismatch surfaces as an [`io::ErrorKind::InvalidData`] error
/// wrapping [`Error::CrcMismatch`]. Dropping the stream releases it.
pub struct EmbeddedFile<S = File> {
    info: FileInfo,
    decoder: Decoder<S>,
    expected_crc: u32,
    hasher: crc32fast::Hasher,
    bytes_read: u64,
    verified: bool,
}

impl<S> EmbeddedFile<S> {
    /// Returns name and size of this entry.
    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    /// Returns the entry name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns the uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.info.size
    }

    fn verify(&self) -> io::Result<()> {
        if self.bytes_read != self.info.size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "entry '{}' ended after {} of {} bytes",
                    self.info.name, self.bytes_read, self.info.size
                ),
            ));
        }
        let actual = self.hasher.clone().finalize();
        if actual != self.expected_crc {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                Error::CrcMismatch {
                    entry_name: self.info.name.clone(),
                    expected: self.expected_crc,
                    actual,
                },
            ));
        }
        Ok(())
    }
}

impl<S: ReadAt> Read for EmbeddedFile<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match &mut self.decoder {
            Decoder::Stored(reader) => reader.read(buf)?,
            Decoder::Deflated(reader) => reader.read(buf)?,
        };

        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.bytes_read += n as u64;
            if self.bytes_read > self.info.size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "entry '{}' is larger than its recorded size {}",
                        self.info.name, self.info.size
                    ),
                ));
            }
        } else if !buf.is_empty() && !self.verified {
            self.verify()?;
            self.verified = true;
        }
        Ok(n)
    }
}

impl<S> std::fmt::Debug for EmbeddedFile<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFile")
            .field("info", &self.info)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}
