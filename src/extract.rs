//! Writing embedded entries out to a directory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::archive_path::escapes_root;
use crate::fs::FileSystem;
use crate::region::ReadAt;
use crate::{Error, Result};

/// Result of an extraction batch.
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    /// Number of entries extracted.
    pub entries_extracted: usize,
    /// Number of entries that failed.
    pub entries_failed: usize,
    /// Total bytes extracted.
    pub bytes_extracted: u64,
    /// Detailed failures (entry name and error message).
    pub failures: Vec<(String, String)>,
}

impl ExtractResult {
    /// Returns true if all selected entries were extracted successfully.
    pub fn is_ok(&self) -> bool {
        self.entries_failed == 0
    }

    /// Returns true if any entries failed.
    pub fn is_err(&self) -> bool {
        self.entries_failed > 0
    }

    fn fail(&mut self, name: &str, error: &Error) {
        log::warn!("skipping '{}': {}", name, error);
        self.entries_failed += 1;
        self.failures.push((name.to_string(), error.to_string()));
    }
}

/// Extracts every entry of `embedded` under `dest`, in name order.
pub fn extract_all<S: ReadAt>(
    embedded: &FileSystem<S>,
    dest: impl AsRef<Path>,
) -> Result<ExtractResult> {
    extract(embedded, &[] as &[&str], dest)
}

/// Extracts the named entries of `embedded` under `dest`.
///
/// An empty `names` slice selects every entry. Each entry `name` is written
/// to `dest/name`, creating parent directories and overwriting existing
/// files.
///
/// Names that do not exist, cannot be decoded, or would land outside `dest`
/// are logged and recorded in [`ExtractResult::failures`]; the remaining
/// names are still extracted.
///
/// # Errors
///
/// Creating directories or files, or copying entry data, aborts the batch.
/// A partially written file is removed first.
pub fn extract<S, N>(
    embedded: &FileSystem<S>,
    names: &[N],
    dest: impl AsRef<Path>,
) -> Result<ExtractResult>
where
    S: ReadAt,
    N: AsRef<str>,
{
    let dest = dest.as_ref();
    let selected: Vec<String> = if names.is_empty() {
        let mut all: Vec<String> = embedded.list().into_iter().map(|info| info.name).collect();
        all.sort();
        all
    } else {
        names.iter().map(|name| name.as_ref().to_string()).collect()
    };

    let mut result = ExtractResult::default();
    for name in &selected {
        if escapes_root(name) {
            result.fail(name, &Error::PathTraversal { path: name.clone() });
            continue;
        }

        let target = dest.join(name);
        if name.ends_with('/') {
            if !embedded.exists(name) {
                result.fail(name, &Error::EntryNotFound { path: name.clone() });
                continue;
            }
            fs::create_dir_all(&target)?;
            result.entries_extracted += 1;
            continue;
        }

        let mut file = match embedded.open(name) {
            Ok(file) => file,
            Err(e) if matches!(e, Error::EntryNotFound { .. }) || e.is_unsupported() => {
                result.fail(name, &e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = write_entry(&mut file, &target)?;
        log::debug!("extracted '{}' ({} bytes)", name, bytes);

        result.entries_extracted += 1;
        result.bytes_extracted += bytes;
    }

    Ok(result)
}

fn write_entry(entry: &mut impl io::Read, target: &Path) -> Result<u64> {
    let mut out = BufWriter::new(File::create(target)?);
    let copied = io::copy(entry, &mut out).and_then(|n| out.flush().map(|()| n));
    match copied {
        Ok(n) => Ok(n),
        Err(e) => {
            drop(out);
            if let Err(remove) = fs::remove_file(target) {
                log::warn!("failed to remove partial file '{}': {}", target.display(), remove);
            }
            Err(Error::from_io(e))
        }
    }
}
