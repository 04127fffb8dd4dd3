//! Appending a container to an existing binary, and undoing it.
//!
//! An [`Archiver`] session streams a new container right after the last byte
//! of the binary. Entries are added one at a time; [`Archiver::close`] writes
//! the container directory and the trailer. If anything fails along the way
//! the binary is truncated back to the length it had when the session
//! started, so a failed session leaves no trace.
//!
//! ```rust,no_run
//! use gar::{ArchiveOptions, Archiver};
//!
//! let mut archiver = Archiver::open_with_options("./app", ArchiveOptions::new().level(9)?)?;
//! archiver.add("cfg/a.txt")?;
//! archiver.add("data/b.bin")?;
//! let result = archiver.close()?;
//! println!("{} entries, {} bytes", result.entries_written, result.total_size);
//! # Ok::<(), gar::Error>(())
//! ```
//!
//! [`restore`] reverses a successful session using nothing but the trailer.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive_path;
use crate::region::RegionWriter;
use crate::trailer::{self, TRAILER_LEN, Trailer};
use crate::{Error, Result};

type Sink = BufWriter<RegionWriter<File>>;

/// How entry data is stored in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Deflate compression.
    #[default]
    Deflate,
    /// No compression.
    Store,
}

/// Options for an archive session.
///
/// # Example
///
/// ```rust
/// use gar::{ArchiveOptions, archiver::Method};
///
/// let options = ArchiveOptions::new().method(Method::Store);
/// assert_eq!(options.method, Method::Store);
///
/// assert!(ArchiveOptions::new().level(10).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveOptions {
    /// Compression method for every entry.
    pub method: Method,
    /// Deflate level (0-9), or `None` for the encoder default.
    pub level: Option<u32>,
}

impl ArchiveOptions {
    /// Creates options with defaults (deflate, default level).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the deflate level.
    ///
    /// - 0: No compression (store only)
    /// - 1-3: Fast compression, lower ratio
    /// - 7-9: Maximum compression, slower
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`] if level is greater than 9.
    pub fn level(mut self, level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidCompressionLevel {
                level: i64::from(level),
            });
        }
        self.level = Some(level);
        Ok(self)
    }

    fn file_options(&self) -> SimpleFileOptions {
        match (self.method, self.level) {
            // Level 0 means no compression.
            (Method::Store, _) | (Method::Deflate, Some(0)) => {
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
            }
            (Method::Deflate, _) => SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(self.level.map(i64::from)),
        }
    }
}

/// Summary of a successful session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveResult {
    /// Length of the binary before the session.
    pub original_size: u64,
    /// Length of the appended container.
    pub container_size: u64,
    /// Length of the file after the session.
    pub total_size: u64,
    /// Number of entries in the container.
    pub entries_written: usize,
}

enum State {
    Open {
        writer: ZipWriter<Sink>,
        /// First failed operation.
        failure: Option<Arc<Error>>,
    },
    Closed,
}

/// An append session on one binary.
///
/// The session has exclusive use of the binary; running two sessions on the
/// same file at once is not detected.
///
/// Entry names are unique within a session: adding a name that is already
/// in the container fails with [`Error::DuplicateEntry`].
///
/// Dropping a session that was not closed restores the binary.
pub struct Archiver {
    path: PathBuf,
    original_size: u64,
    options: ArchiveOptions,
    entries_written: usize,
    names: HashSet<String>,
    state: State,
}

impl Archiver {
    /// Opens `binary` for appending with default options.
    pub fn open(binary: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(binary, ArchiveOptions::default())
    }

    /// Opens `binary` for appending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the binary cannot be opened for writing.
    pub fn open_with_options(binary: impl AsRef<Path>, options: ArchiveOptions) -> Result<Self> {
        let path = binary.as_ref().to_path_buf();
        // Not opened in append mode: the container writer seeks back to
        // patch local headers once an entry's sizes are known.
        let file = OpenOptions::new().write(true).open(&path)?;
        let original_size = file.metadata()?.len();
        let sink = BufWriter::new(RegionWriter::new(file, original_size)?);

        log::debug!(
            "archive session on '{}' starts at offset {}",
            path.display(),
            original_size
        );

        Ok(Self {
            path,
            original_size,
            options,
            entries_written: 0,
            names: HashSet::new(),
            state: State::Open {
                writer: ZipWriter::new(sink),
                failure: None,
            },
        })
    }

    /// Returns the length the binary had when the session started.
    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    /// Returns the number of entries added so far.
    pub fn entries_written(&self) -> usize {
        self.entries_written
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Adds the file at `source`, named after its cleaned path.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the source cannot be read or is a directory
    /// - [`Error::InvalidArchivePath`] if no entry name can be derived
    /// - [`Error::DuplicateEntry`] if the name was already added
    /// - [`Error::SessionFailed`] if an earlier operation already failed
    /// - [`Error::Closed`] after [`close`](Self::close)
    pub fn add(&mut self, source: impl AsRef<Path>) -> Result<()> {
        let source = source.as_ref();
        let options = self.options.file_options();
        let writer = session_writer(&mut self.state)?;
        let result = append_file(writer, &mut self.names, source, options);
        self.record(result)
    }

    /// Adds an entry from memory. `name` is normalized like a source path.
    pub fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let options = self.options.file_options();
        let writer = session_writer(&mut self.state)?;
        let result = append_bytes(writer, &mut self.names, name, data, options);
        self.record(result)
    }

    /// Writes the container directory and the trailer.
    ///
    /// On failure, including a failure recorded by an earlier `add`, the
    /// binary is truncated back to its original length and the error is
    /// returned. An earlier failure comes back as [`Error::SessionFailed`]
    /// wrapping the original error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FatalCorruption`] if the binary could not be restored.
    pub fn close(&mut self) -> Result<ArchiveResult> {
        let (writer, failure) = match std::mem::replace(&mut self.state, State::Closed) {
            State::Open { writer, failure } => (writer, failure),
            State::Closed => return Err(Error::Closed),
        };

        if let Some(first) = failure {
            drop(writer);
            self.restore_original()?;
            return Err(Error::SessionFailed(first));
        }

        match finish(writer, self.original_size) {
            Ok(container_size) => {
                let result = ArchiveResult {
                    original_size: self.original_size,
                    container_size,
                    total_size: self.original_size + container_size + TRAILER_LEN as u64,
                    entries_written: self.entries_written,
                };
                log::debug!(
                    "archived {} entries into '{}' ({} bytes)",
                    result.entries_written,
                    self.path.display(),
                    result.total_size
                );
                Ok(result)
            }
            Err(e) => {
                self.restore_original()?;
                Err(e)
            }
        }
    }

    fn record(&mut self, result: Result<String>) -> Result<()> {
        match result {
            Ok(name) => {
                log::debug!("added '{}'", name);
                self.entries_written += 1;
                Ok(())
            }
            Err(e) => {
                let first = Arc::new(e);
                let returned = first.replicate();
                if let State::Open { failure, .. } = &mut self.state {
                    *failure = Some(first);
                }
                Err(returned)
            }
        }
    }

    fn restore_original(&self) -> Result<()> {
        log::warn!(
            "archive session on '{}' failed, truncating back to {} bytes",
            self.path.display(),
            self.original_size
        );
        truncate(&self.path, self.original_size)
    }
}

impl Drop for Archiver {
    fn drop(&mut self) {
        if let State::Open { writer, .. } = std::mem::replace(&mut self.state, State::Closed) {
            drop(writer);
            if let Err(e) = self.restore_original() {
                log::error!("{}", e);
                std::process::abort();
            }
        }
    }
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver")
            .field("path", &self.path)
            .field("original_size", &self.original_size)
            .field("options", &self.options)
            .field("entries_written", &self.entries_written)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn session_writer(state: &mut State) -> Result<&mut ZipWriter<Sink>> {
    match state {
        State::Open {
            writer,
            failure: None,
        } => Ok(writer),
        State::Open {
            failure: Some(first),
            ..
        } => Err(Error::SessionFailed(Arc::clone(first))),
        State::Closed => Err(Error::Closed),
    }
}

fn claim_name(names: &mut HashSet<String>, name: &str) -> Result<()> {
    if names.insert(name.to_string()) {
        Ok(())
    } else {
        Err(Error::DuplicateEntry {
            path: name.to_string(),
        })
    }
}

fn append_file(
    writer: &mut ZipWriter<Sink>,
    names: &mut HashSet<String>,
    source: &Path,
    options: SimpleFileOptions,
) -> Result<String> {
    let name = archive_path::clean_name(source)?;
    let mut file = File::open(source)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is a directory", source.display()),
        )));
    }
    claim_name(names, &name)?;

    writer.start_file(name.as_str(), options.large_file(metadata.len() >= u32::MAX as u64))?;
    io::copy(&mut file, writer)?;
    Ok(name)
}

fn append_bytes(
    writer: &mut ZipWriter<Sink>,
    names: &mut HashSet<String>,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> Result<String> {
    let name = archive_path::normalize(name)?;
    claim_name(names, &name)?;
    writer.start_file(
        name.as_str(),
        options.large_file(data.len() as u64 >= u32::MAX as u64),
    )?;
    writer.write_all(data)?;
    Ok(name)
}

/// Finalizes the container and appends the trailer. Returns the container size.
fn finish(writer: ZipWriter<Sink>, original_size: u64) -> Result<u64> {
    let mut sink = writer.finish()?;
    let container_size = sink.stream_position()?;
    sink.write_all(&Trailer::new(original_size).encode())?;
    sink.flush()?;
    Ok(container_size)
}

fn truncate(path: &Path, size: u64) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_len(size))
        .map_err(|source| Error::FatalCorruption {
            path: path.to_path_buf(),
            size,
            source,
        })
}

/// Strips the container and trailer from `binary`.
///
/// Returns the restored length.
///
/// # Errors
///
/// - [`Error::InvalidFormat`] if the binary carries no trailer
/// - [`Error::Io`] if the binary cannot be opened or truncated
pub fn restore(binary: impl AsRef<Path>) -> Result<u64> {
    let path = binary.as_ref();
    let region = {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        trailer::locate(&file, len)?
    };

    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(region.start)?;
    log::debug!("restored '{}' to {} bytes", path.display(), region.start);
    Ok(region.start)
}
