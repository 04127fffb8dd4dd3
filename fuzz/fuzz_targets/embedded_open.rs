//! Fuzz target for FileSystem::from_source with arbitrary byte input.
//!
//! The input is treated as a whole binary: trailer, container directory and
//! entry data are all attacker-controlled. Looking for panics, hangs and
//! unbounded allocations in locating, parsing and decoding.
//!
//! Run with: cargo +nightly fuzz run embedded_open

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Read;

fuzz_target!(|data: &[u8]| {
    let len = data.len() as u64;
    let Ok(fs) = gar::FileSystem::from_source(data.to_vec(), len) else {
        return;
    };

    for info in fs.list() {
        if let Ok(file) = fs.open(&info.name) {
            // Cap the read so a lying size field cannot exhaust memory.
            let mut sink = Vec::new();
            let _ = file.take(1 << 20).read_to_end(&mut sink);
        }
    }
    let _ = fs.close();
});
