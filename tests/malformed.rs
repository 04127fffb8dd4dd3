//! Tests for binaries with missing, damaged or hostile trailers and containers.

use std::fs;

use gar::archiver::Method;
use gar::{ArchiveOptions, Archiver, Error, FileSystem, Trailer, extract_all};

mod common;

use common::{SCENARIO, archive_entries, binary_in_tempdir};

#[test]
fn test_file_shorter_than_trailer() {
    let dir = tempfile::TempDir::new().unwrap();
    for len in [0usize, 1, 10] {
        let path = common::write_binary(dir.path(), len);
        let err = FileSystem::open_path(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)), "len {len}: {err:?}");
    }
}

#[test]
fn test_plain_binary() {
    let (_dir, binary) = binary_in_tempdir();
    let err = FileSystem::open_path(&binary).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
}

#[test]
fn test_bad_marker() {
    let (_dir, binary) = binary_in_tempdir();
    archive_entries(&binary, SCENARIO);

    let mut data = fs::read(&binary).unwrap();
    let last = data.len() - 1;
    data[last] = b'Z';
    fs::write(&binary, &data).unwrap();

    let err = FileSystem::open_path(&binary).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
}

#[test]
fn test_recorded_size_past_end() {
    let (_dir, binary) = binary_in_tempdir();
    let mut data = fs::read(&binary).unwrap();
    data.extend_from_slice(&Trailer::new(u64::MAX).encode());
    fs::write(&binary, &data).unwrap();

    let err = FileSystem::open_path(&binary).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
}

#[test]
fn test_trailer_over_garbage() {
    let (_dir, binary) = binary_in_tempdir();
    let mut data = fs::read(&binary).unwrap();
    let original_size = data.len() as u64;
    data.extend_from_slice(b"this is not a container at all");
    data.extend_from_slice(&Trailer::new(original_size).encode());
    fs::write(&binary, &data).unwrap();

    let err = FileSystem::open_path(&binary).unwrap_err();
    assert!(err.is_format_error(), "got {err:?}");
}

#[test]
fn test_corrupted_entry_data() {
    let (dir, binary) = binary_in_tempdir();
    let payload = b"stored entry payload that will be damaged";
    let mut archiver =
        Archiver::open_with_options(&binary, ArchiveOptions::new().method(Method::Store)).unwrap();
    archiver.add_bytes("victim.txt", payload).unwrap();
    archiver.add_bytes("intact.txt", b"intact").unwrap();
    archiver.close().unwrap();

    let mut data = fs::read(&binary).unwrap();
    let at = data
        .windows(payload.len())
        .position(|w| w == payload)
        .unwrap();
    data[at + 3] ^= 0x20;
    fs::write(&binary, &data).unwrap();

    let fs = FileSystem::open_path(&binary).unwrap();
    let err = fs.read_to_vec("victim.txt").unwrap_err();
    assert!(err.is_corruption());
    assert_eq!(err.entry_name(), Some("victim.txt"));
    assert_eq!(fs.read_to_vec("intact.txt").unwrap(), b"intact");

    // Extraction stops at the damaged entry and leaves no partial file.
    let out = dir.path().join("out");
    let err = extract_all(&fs, &out).unwrap_err();
    assert!(matches!(err, Error::CrcMismatch { .. }));
    assert!(!out.join("victim.txt").exists());
}
