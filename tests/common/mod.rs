//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gar::{ArchiveResult, Archiver};
use tempfile::TempDir;

/// Size of the fake binary used by most tests.
pub const BINARY_SIZE: usize = 1000;

/// Deterministic stand-in for an executable: an ELF-looking header followed
/// by a byte pattern.
pub fn fake_binary_bytes(len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
    let magic = b"\x7FELF";
    let n = magic.len().min(len);
    data[..n].copy_from_slice(&magic[..n]);
    data
}

/// Writes a fake binary of `len` bytes into `dir` and returns its path.
pub fn write_binary(dir: &Path, len: usize) -> PathBuf {
    let path = dir.join("app");
    fs::write(&path, fake_binary_bytes(len)).expect("Failed to write binary");
    path
}

/// Creates a temp dir holding a fake binary of [`BINARY_SIZE`] bytes.
pub fn binary_in_tempdir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_binary(dir.path(), BINARY_SIZE);
    (dir, path)
}

/// Writes `data` to `dir/name`, creating parent directories.
pub fn write_source(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create source dir");
    }
    fs::write(&path, data).expect("Failed to write source file");
    path
}

/// Embeds in-memory entries into the binary at `path`.
pub fn archive_entries(path: &Path, entries: &[(&str, &[u8])]) -> ArchiveResult {
    let mut archiver = Archiver::open(path).expect("Failed to open archiver");
    for (name, data) in entries {
        archiver.add_bytes(name, data).expect("Failed to add entry");
    }
    archiver.close().expect("Failed to close archiver")
}

/// The two entries of the reference scenario.
pub const SCENARIO: &[(&str, &[u8])] = &[("cfg/a.txt", b"hello"), ("data/b.bin", b"\x01\x02\x03")];
