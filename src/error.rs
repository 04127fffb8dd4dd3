//! Error types for embedded archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when appending, locating or reading an embedded container,
//! along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`:
//!
//! ```rust,no_run
//! use gar::{Error, FileSystem};
//!
//! fn open_embedded(path: &str) -> gar::Result<FileSystem> {
//!     match FileSystem::open_path(path) {
//!         Ok(fs) => Ok(fs),
//!         Err(Error::InvalidFormat(msg)) => {
//!             eprintln!("{} carries no embedded files: {}", path, msg);
//!             Err(Error::InvalidFormat(msg))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```
//!
//! ## Fatal corruption
//!
//! [`Error::FatalCorruption`] is special: it is only produced when a failed
//! archive operation could not truncate the binary back to its original
//! length. The file is then in an indeterminate state. Callers must not carry
//! on as if the binary were usable; the `gar` tool aborts the process.
//!
//! ```rust,no_run
//! use gar::Archiver;
//!
//! fn pack(binary: &str, files: &[&str]) -> gar::Result<()> {
//!     let mut archiver = Archiver::open(binary)?;
//!     for file in files {
//!         if archiver.add(file).is_err() {
//!             break;
//!         }
//!     }
//!     match archiver.close() {
//!         Err(e) if e.is_fatal() => {
//!             eprintln!("{}", e);
//!             std::process::abort();
//!         }
//!         other => other.map(|_| ()),
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use zip::result::ZipError;

/// Helper struct for formatting CrcMismatch error messages.
struct CrcMismatchDisplay<'a> {
    entry_name: &'a str,
    expected: u32,
    actual: u32,
}

impl std::fmt::Display for CrcMismatchDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CRC mismatch for entry '{}': expected {:#x}, got {:#x}",
            self.entry_name, self.expected, self.actual
        )
    }
}

/// The main error type for embedded archive operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | Opening, reading, writing or truncating files |
/// | Format | [`InvalidFormat`][Self::InvalidFormat], [`Zip`][Self::Zip] | Missing trailer, damaged container |
/// | Lookup | [`EntryNotFound`][Self::EntryNotFound], [`DuplicateEntry`][Self::DuplicateEntry] | Requested name is not embedded, or added twice |
/// | Lifecycle | [`Closed`][Self::Closed], [`SessionFailed`][Self::SessionFailed] | Use after close or after a failed add |
/// | Integrity | [`CrcMismatch`][Self::CrcMismatch], [`FatalCorruption`][Self::FatalCorruption] | Damaged data, unrecoverable binary |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    ///
    /// Check the underlying [`std::io::ErrorKind`] for specific handling:
    ///
    /// ```rust
    /// use gar::Error;
    /// use std::io::ErrorKind;
    ///
    /// fn handle_io_error(error: &Error) {
    ///     if let Error::Io(e) = error {
    ///         match e.kind() {
    ///             ErrorKind::NotFound => println!("File not found"),
    ///             ErrorKind::PermissionDenied => println!("Access denied"),
    ///             _ => println!("I/O error: {}", e),
    ///         }
    ///     }
    /// }
    /// ```
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not end with a valid trailer.
    ///
    /// Returned when the file is shorter than the trailer, when its last bytes
    /// are not the marker, or when the recorded offset points past the
    /// container.
    #[error("Invalid embedded archive: {0}")]
    InvalidFormat(String),

    /// The embedded container itself could not be parsed or written.
    #[error("Container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An entry was not found in the embedded container.
    #[error("Entry not found: {path}")]
    EntryNotFound {
        /// The name that was looked up.
        path: String,
    },

    /// The resource was already closed.
    ///
    /// Returned by an [`Archiver`](crate::Archiver) after `close`, and by a
    /// [`FileSystem`](crate::FileSystem) after `close`.
    #[error("use of closed resource")]
    Closed,

    /// A previous `add` failed, so the session refuses further work.
    ///
    /// The first recorded failure wins and is carried here as the source,
    /// see [`Error::first_failure`].
    #[error("archive session already failed: {0}")]
    SessionFailed(#[source] Arc<Error>),

    /// The entry uses a compression method this crate cannot decode.
    #[error("Unsupported compression method {method} for entry '{path}'")]
    UnsupportedMethod {
        /// The entry name.
        path: String,
        /// The method as reported by the container.
        method: String,
    },

    /// A feature required by the entry is not supported.
    #[error("Unsupported feature for entry '{path}': {feature}")]
    UnsupportedFeature {
        /// The entry name.
        path: String,
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// The decompressed data does not match the recorded CRC-32 or size.
    #[error("{}", CrcMismatchDisplay { entry_name, expected: *expected, actual: *actual })]
    CrcMismatch {
        /// The entry name.
        entry_name: String,
        /// The CRC recorded in the container directory.
        expected: u32,
        /// The CRC of the data actually read.
        actual: u32,
    },

    /// An entry name would escape the extraction directory.
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: String,
    },

    /// An archive session was asked to add a name it already holds.
    #[error("Duplicate entry name: {path}")]
    DuplicateEntry {
        /// The normalized entry name.
        path: String,
    },

    /// A source path could not be turned into an entry name.
    #[error("Invalid archive path: {0}")]
    InvalidArchivePath(String),

    /// An invalid compression level was provided.
    #[error("invalid compression level {level}: must be 0-9")]
    InvalidCompressionLevel {
        /// The invalid level that was provided.
        level: i64,
    },

    /// Restoring the binary after a failed archive operation failed too.
    ///
    /// The binary may now contain a partial container and no trailer. This
    /// is not recoverable: callers must stop and surface it (the `gar` tool
    /// aborts the process).
    #[error(
        "binary '{}' left corrupted: could not truncate back to {size} bytes: {source}",
        path.display()
    )]
    FatalCorruption {
        /// The binary that could not be restored.
        path: PathBuf,
        /// The length it should have been truncated to.
        size: u64,
        /// Why the truncation failed.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Returns `true` if the binary's integrity can no longer be trusted.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gar::Error;
    ///
    /// fn must_abort(error: &Error) -> bool {
    ///     error.is_fatal()
    /// }
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::FatalCorruption { .. })
    }

    /// Returns `true` if the file is not a valid container-bearing binary.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::InvalidFormat(_) | Error::Zip(_))
    }

    /// Returns `true` if this is a data corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CrcMismatch { .. } | Error::FatalCorruption { .. }
        )
    }

    /// Returns `true` if this error is related to unsupported features or methods.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedMethod { .. } | Error::UnsupportedFeature { .. }
        )
    }

    /// Returns the entry name associated with this error, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gar::Error;
    ///
    /// fn log_error(error: &Error) {
    ///     if let Some(name) = error.entry_name() {
    ///         eprintln!("Error for '{}': {}", name, error);
    ///     }
    /// }
    /// ```
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::EntryNotFound { path } => Some(path.as_str()),
            Error::UnsupportedMethod { path, .. } => Some(path.as_str()),
            Error::UnsupportedFeature { path, .. } => Some(path.as_str()),
            Error::CrcMismatch { entry_name, .. } => Some(entry_name.as_str()),
            Error::PathTraversal { path } => Some(path.as_str()),
            Error::DuplicateEntry { path } => Some(path.as_str()),
            _ => None,
        }
    }

    /// Returns the error that failed an archive session.
    ///
    /// Looks through [`Error::SessionFailed`]; any other error is returned
    /// as is.
    pub fn first_failure(&self) -> &Error {
        match self {
            Error::SessionFailed(first) => first.first_failure(),
            other => other,
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Error::InvalidFormat(reason.into())
    }

    /// Converts an I/O error, recovering a crate error tunneled through it.
    ///
    /// Entry streams implement [`std::io::Read`], so integrity failures such
    /// as [`Error::CrcMismatch`] travel inside an `io::Error`.
    pub(crate) fn from_io(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Error::Io(io::Error::new(kind, other)),
            None => Error::Io(io::Error::from(kind)),
        }
    }
}

impl Error {
    /// Builds an equivalent error with the same variant and message.
    ///
    /// OS errors keep their code; other I/O sources are flattened to text.
    pub(crate) fn replicate(&self) -> Error {
        match self {
            Error::Io(e) => Error::Io(replicate_io(e)),
            Error::InvalidFormat(msg) => Error::InvalidFormat(msg.clone()),
            Error::Zip(e) => Error::Zip(replicate_zip(e)),
            Error::EntryNotFound { path } => Error::EntryNotFound { path: path.clone() },
            Error::Closed => Error::Closed,
            Error::SessionFailed(first) => Error::SessionFailed(Arc::clone(first)),
            Error::UnsupportedMethod { path, method } => Error::UnsupportedMethod {
                path: path.clone(),
                method: method.clone(),
            },
            Error::UnsupportedFeature { path, feature } => Error::UnsupportedFeature {
                path: path.clone(),
                feature: *feature,
            },
            Error::CrcMismatch {
                entry_name,
                expected,
                actual,
            } => Error::CrcMismatch {
                entry_name: entry_name.clone(),
                expected: *expected,
                actual: *actual,
            },
            Error::PathTraversal { path } => Error::PathTraversal { path: path.clone() },
            Error::DuplicateEntry { path } => Error::DuplicateEntry { path: path.clone() },
            Error::InvalidArchivePath(msg) => Error::InvalidArchivePath(msg.clone()),
            Error::InvalidCompressionLevel { level } => {
                Error::InvalidCompressionLevel { level: *level }
            }
            Error::FatalCorruption { path, size, source } => Error::FatalCorruption {
                path: path.clone(),
                size: *size,
                source: replicate_io(source),
            },
        }
    }
}

fn replicate_io(err: &io::Error) -> io::Error {
    match err.raw_os_error() {
        Some(code) => io::Error::from_raw_os_error(code),
        None => io::Error::new(err.kind(), err.to_string()),
    }
}

fn replicate_zip(err: &ZipError) -> ZipError {
    match err {
        ZipError::Io(e) => ZipError::Io(replicate_io(e)),
        ZipError::InvalidArchive(msg) => ZipError::InvalidArchive(msg.clone()),
        ZipError::UnsupportedArchive(msg) => ZipError::UnsupportedArchive(*msg),
        ZipError::FileNotFound => ZipError::FileNotFound,
        other => ZipError::Io(io::Error::other(other.to_string())),
    }
}

/// A specialized Result type for embedded archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_invalid_format() {
        let err = Error::invalid_format("missing marker");
        assert_eq!(err.to_string(), "Invalid embedded archive: missing marker");
        assert!(err.is_format_error());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_entry_not_found() {
        let err = Error::EntryNotFound {
            path: "cfg/a.txt".into(),
        };
        assert_eq!(err.to_string(), "Entry not found: cfg/a.txt");
        assert_eq!(err.entry_name(), Some("cfg/a.txt"));
    }

    #[test]
    fn test_closed() {
        assert_eq!(Error::Closed.to_string(), "use of closed resource");
        assert_eq!(Error::Closed.entry_name(), None);
    }

    #[test]
    fn test_crc_mismatch() {
        let err = Error::CrcMismatch {
            entry_name: "path/to/file.txt".into(),
            expected: 0xDEADBEEF,
            actual: 0xCAFEBABE,
        };
        let msg = err.to_string();
        assert!(msg.contains("path/to/file.txt"));
        assert!(msg.contains("0xdeadbeef"));
        assert!(msg.contains("0xcafebabe"));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_fatal_corruption() {
        let err = Error::FatalCorruption {
            path: PathBuf::from("app"),
            size: 1000,
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_fatal());
        assert!(err.is_corruption());
        let msg = err.to_string();
        assert!(msg.contains("app"));
        assert!(msg.contains("1000"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unsupported() {
        let err = Error::UnsupportedMethod {
            path: "a.bin".into(),
            method: "Bzip2".into(),
        };
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("Bzip2"));

        let err = Error::UnsupportedFeature {
            path: "a.bin".into(),
            feature: "encryption",
        };
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("encryption"));
    }

    #[test]
    fn test_invalid_compression_level() {
        let err = Error::InvalidCompressionLevel { level: 15 };
        assert!(err.to_string().contains("15"));
    }

    #[test]
    fn test_from_io_recovers_tunneled_error() {
        let tunneled = io::Error::new(
            io::ErrorKind::InvalidData,
            Error::CrcMismatch {
                entry_name: "a.txt".into(),
                expected: 1,
                actual: 2,
            },
        );
        assert!(matches!(
            Error::from_io(tunneled),
            Error::CrcMismatch { expected: 1, actual: 2, .. }
        ));

        let plain = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(Error::from_io(plain), Error::Io(_)));
    }

    #[test]
    fn test_session_failed_keeps_first_error() {
        let first: Error = io::Error::new(io::ErrorKind::NotFound, "missing.txt").into();
        let err = Error::SessionFailed(Arc::new(first));
        assert!(err.to_string().contains("missing.txt"));
        assert!(matches!(err.first_failure(), Error::Io(e) if e.kind() == io::ErrorKind::NotFound));

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_replicate_keeps_variant() {
        let err = Error::Io(io::Error::from_raw_os_error(2));
        match err.replicate() {
            Error::Io(e) => assert_eq!(e.raw_os_error(), Some(2)),
            other => panic!("unexpected {:?}", other),
        }

        let err = Error::DuplicateEntry {
            path: "a.txt".into(),
        };
        assert!(matches!(err.replicate(), Error::DuplicateEntry { path } if path == "a.txt"));
        assert_eq!(err.entry_name(), Some("a.txt"));
    }
}
