//! End-to-end tests: archive, inspect, extract and restore a binary on disk.

use std::fs;
use std::io::Read;

use gar::archive_path::clean_name;
use gar::{ArchiveOptions, Archiver, FileSystem, archiver::Method, extract, extract_all, restore};
use tempfile::TempDir;

mod common;

use common::{BINARY_SIZE, SCENARIO, archive_entries, binary_in_tempdir, write_source};

// =============================================================================
// Reference scenario
// =============================================================================

#[test]
fn test_reference_scenario() {
    let (_dir, binary) = binary_in_tempdir();
    let original = fs::read(&binary).unwrap();

    let result = archive_entries(&binary, SCENARIO);
    assert_eq!(result.original_size, BINARY_SIZE as u64);
    assert_eq!(result.entries_written, 2);

    // 1000 + container + 11-byte trailer
    let len = fs::metadata(&binary).unwrap().len();
    assert_eq!(len, BINARY_SIZE as u64 + result.container_size + 11);
    assert_eq!(len, result.total_size);

    let data = fs::read(&binary).unwrap();
    assert_eq!(&data[..BINARY_SIZE], &original[..]);
    assert_eq!(&data[data.len() - 3..], b"GAR");
    assert_eq!(
        &data[data.len() - 11..data.len() - 3],
        &(BINARY_SIZE as u64).to_be_bytes()
    );

    let fs = FileSystem::open_path(&binary).unwrap();
    assert_eq!(fs.binary_size(), BINARY_SIZE as u64);
    let mut list = fs.list();
    list.sort_by(|a, b| a.name.cmp(&b.name));
    let listed: Vec<(&str, u64)> = list.iter().map(|i| (i.name.as_str(), i.size)).collect();
    assert_eq!(listed, vec![("cfg/a.txt", 5), ("data/b.bin", 3)]);
    fs.close().unwrap();

    assert_eq!(restore(&binary).unwrap(), BINARY_SIZE as u64);
    assert_eq!(fs::read(&binary).unwrap(), original);
}

// =============================================================================
// Round trips through the filesystem
// =============================================================================

#[test]
fn test_archive_files_then_read() {
    let (dir, binary) = binary_in_tempdir();
    let a = write_source(dir.path(), "src/cfg/a.txt", b"alpha config");
    let big: Vec<u8> = (0..200_000u32).flat_map(|i| i.to_le_bytes()).collect();
    let b = write_source(dir.path(), "src/data/big.bin", &big);

    let mut archiver = Archiver::open(&binary).unwrap();
    archiver.add(&a).unwrap();
    archiver.add(&b).unwrap();
    archiver.close().unwrap();

    let fs = FileSystem::open_path(&binary).unwrap();
    let name_a = clean_name(&a).unwrap();
    let name_b = clean_name(&b).unwrap();
    assert!(!name_a.starts_with('/'));
    assert_eq!(fs.metadata(&name_b).unwrap().size, big.len() as u64);

    let mut text = String::new();
    fs.open(&name_a).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "alpha config");
    assert_eq!(fs.read_to_vec(&name_b).unwrap(), big);
}

#[test]
fn test_extract_byte_identical() {
    let (dir, binary) = binary_in_tempdir();
    let payload: Vec<u8> = (0..10_000).map(|i| (i % 13) as u8).collect();
    archive_entries(&binary, &[("cfg/a.txt", b"hello"), ("blob/x.bin", payload.as_slice())]);

    let out = dir.path().join("out");
    let fs = FileSystem::open_path(&binary).unwrap();
    let result = extract_all(&fs, &out).unwrap();
    assert!(result.is_ok());
    assert_eq!(result.entries_extracted, 2);
    assert_eq!(result.bytes_extracted, 5 + payload.len() as u64);

    assert_eq!(fs::read(out.join("cfg/a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(out.join("blob/x.bin")).unwrap(), payload);
}

#[test]
fn test_extract_missing_name_is_skipped() {
    let (dir, binary) = binary_in_tempdir();
    archive_entries(&binary, SCENARIO);

    let out = dir.path().join("out");
    let fs = FileSystem::open_path(&binary).unwrap();
    let result = extract(&fs, &["nope.txt", "cfg/a.txt"], &out).unwrap();

    assert_eq!(result.entries_failed, 1);
    assert_eq!(result.entries_extracted, 1);
    assert!(!out.join("nope.txt").exists());
    assert!(out.join("cfg/a.txt").exists());
    assert!(!out.join("data/b.bin").exists());
}

#[test]
fn test_store_and_levels() {
    let payload = b"repetitive ".repeat(1000);
    for options in [
        ArchiveOptions::new().method(Method::Store),
        ArchiveOptions::new().level(0).unwrap(),
        ArchiveOptions::new().level(9).unwrap(),
    ] {
        let (_dir, binary) = binary_in_tempdir();
        let mut archiver = Archiver::open_with_options(&binary, options).unwrap();
        archiver.add_bytes("r.txt", &payload).unwrap();
        let result = archiver.close().unwrap();

        if options.method == Method::Store {
            assert!(result.container_size > payload.len() as u64);
        }
        let fs = FileSystem::open_path(&binary).unwrap();
        assert_eq!(fs.read_to_vec("r.txt").unwrap(), payload);
    }
}

#[test]
fn test_empty_session() {
    let (_dir, binary) = binary_in_tempdir();
    let result = Archiver::open(&binary).unwrap().close().unwrap();
    assert_eq!(result.entries_written, 0);

    let fs = FileSystem::open_path(&binary).unwrap();
    assert!(fs.is_empty());
    assert_eq!(fs.binary_size(), BINARY_SIZE as u64);
}

#[test]
fn test_restore_then_archive_again() {
    let (_dir, binary) = binary_in_tempdir();
    archive_entries(&binary, SCENARIO);
    restore(&binary).unwrap();
    archive_entries(&binary, &[("other.txt", b"second round")]);

    let fs = FileSystem::open_path(&binary).unwrap();
    assert_eq!(fs.binary_size(), BINARY_SIZE as u64);
    assert_eq!(fs.len(), 1);
    assert_eq!(fs.read_to_vec("other.txt").unwrap(), b"second round");
}

#[test]
fn test_empty_binary() {
    let dir = TempDir::new().unwrap();
    let binary = common::write_binary(dir.path(), 0);
    archive_entries(&binary, SCENARIO);

    let fs = FileSystem::open_path(&binary).unwrap();
    assert_eq!(fs.binary_size(), 0);
    assert_eq!(fs.read_to_vec("data/b.bin").unwrap(), b"\x01\x02\x03");
}
