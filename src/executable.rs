//! Access to the files embedded in the running executable.
//!
//! The executable is opened the first time any function here is called, and
//! stays open for the life of the process.
//!
//! ```rust,no_run
//! use std::io::Read;
//!
//! let mut config = String::new();
//! gar::executable::open("cfg/app.toml")?.read_to_string(&mut config)?;
//! # Ok::<(), gar::Error>(())
//! ```
//!
//! # Panics
//!
//! Every function panics if the executable cannot be opened or carries no
//! embedded container. A binary that expects embedded files but was shipped
//! without them is a packaging defect, not something to recover from.

use std::fs::File;
use std::sync::LazyLock;

use crate::fs::{EmbeddedFile, FileInfo, FileSystem};
use crate::Result;

static EXECUTABLE: LazyLock<FileSystem> = LazyLock::new(|| {
    let path = match std::env::current_exe() {
        Ok(path) => path,
        Err(e) => panic!("failed to locate the running executable: {e}"),
    };
    match FileSystem::open_path(&path) {
        Ok(fs) => fs,
        Err(e) => panic!(
            "failed to open embedded files of '{}': {e}",
            path.display()
        ),
    }
});

/// Returns the file system of the running executable.
pub fn filesystem() -> &'static FileSystem {
    &EXECUTABLE
}

/// Opens an entry embedded in the running executable.
pub fn open(name: &str) -> Result<EmbeddedFile<File>> {
    EXECUTABLE.open(name)
}

/// Lists the entries embedded in the running executable.
pub fn list() -> Vec<FileInfo> {
    EXECUTABLE.list()
}
