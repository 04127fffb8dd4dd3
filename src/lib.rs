//! # gar
//!
//! Embed a set of files into an executable and read them back at runtime.
//!
//! A ZIP container is appended to the end of the binary, followed by an
//! 11-byte trailer recording where the original binary ends. The binary
//! itself keeps working; the trailer is found from the end of the file, so
//! no side-channel path or build step is needed to read the files back.
//!
//! ```text
//! [ original binary ][ ZIP container ][ u64 BE original_size ][ "GAR" ]
//! ```
//!
//! ## Quick Start
//!
//! ### Embedding Files
//!
//! ```rust,no_run
//! use gar::{Archiver, Result};
//!
//! fn main() -> Result<()> {
//!     let mut archiver = Archiver::open("./target/release/app")?;
//!     archiver.add("cfg/a.txt")?;
//!     archiver.add("data/b.bin")?;
//!
//!     // If anything failed, the binary is restored to its original length.
//!     let result = archiver.close()?;
//!     println!("Appended {} entries", result.entries_written);
//!     Ok(())
//! }
//! ```
//!
//! ### Reading Files Embedded in the Running Program
//!
//! ```rust,no_run
//! use std::io::Read;
//!
//! fn main() -> gar::Result<()> {
//!     for info in gar::executable::list() {
//!         println!("{} ({} bytes)", info.name, info.size);
//!     }
//!
//!     let mut text = String::new();
//!     gar::executable::open("cfg/a.txt")?.read_to_string(&mut text)?;
//!     Ok(())
//! }
//! ```
//!
//! ### Inspecting Another Binary
//!
//! ```rust,no_run
//! use gar::{FileSystem, extract_all, restore};
//!
//! fn main() -> gar::Result<()> {
//!     let fs = FileSystem::open_path("./app")?;
//!     println!("Size of binary: {}", fs.binary_size());
//!     extract_all(&fs, "./out")?;
//!     fs.close()?;
//!
//!     // Strip the container again.
//!     restore("./app")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | No | The `gar` command-line tool |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod archive_path;
pub mod archiver;
pub mod error;
pub mod executable;
pub mod extract;
pub mod fs;
pub mod region;
pub mod trailer;

pub use error::{Error, Result};

// Re-export reading API at crate root for convenience
pub use fs::{EmbeddedFile, FileInfo, FileSystem};

// Re-export writing API at crate root for convenience
pub use archiver::{ArchiveOptions, ArchiveResult, Archiver, restore};

pub use extract::{ExtractResult, extract, extract_all};
pub use region::{ReadAt, RegionReader, RegionWriter};
pub use trailer::{TailRegion, Trailer, locate};
