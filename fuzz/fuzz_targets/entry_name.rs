//! Fuzz target for entry-name normalization.
//!
//! Run with: cargo +nightly fuzz run entry_name

#![no_main]

use gar::archive_path::{clean_str, escapes_root};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    let cleaned = clean_str(path);
    assert!(!cleaned.starts_with('/'));
    assert_eq!(clean_str(&cleaned), cleaned);
    if !escapes_root(&cleaned) {
        assert!(cleaned.split('/').all(|seg| seg != ".."));
    }
});
