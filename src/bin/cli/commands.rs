//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};

use gar::{ArchiveOptions, Archiver, Error, FileSystem};

use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{format_archive_result, format_extract_result, format_inspect};

/// Inspect command implementation
pub fn inspect(binary: &Path) -> ExitCode {
    let fs = match open_filesystem(binary) {
        Ok(fs) => fs,
        Err(code) => return code,
    };

    print!("{}", format_inspect(fs.binary_size(), &fs.list()));
    close_filesystem(&fs);
    ExitCode::Success
}

/// Archive command implementation
pub fn archive(binary: &Path, files: &[PathBuf], options: ArchiveOptions) -> ExitCode {
    let mut archiver = match Archiver::open_with_options(binary, options) {
        Ok(a) => a,
        Err(e) => {
            log::error!("cannot open '{}' for archiving: {}", binary.display(), e);
            return error_to_exit_code(&e);
        }
    };

    for file in files {
        if let Err(e) = archiver.add(file) {
            log::error!("add file '{}': {}", file.display(), e);
            // Closing restores the binary and reports the same failure.
            return match archiver.close() {
                Err(e) if e.is_fatal() => abort_on_corruption(&e),
                _ => error_to_exit_code(&e),
            };
        }
        log::info!("file '{}' added", file.display());
    }

    match archiver.close() {
        Ok(result) => {
            print!("{}", format_archive_result(&result));
            ExitCode::Success
        }
        Err(e) if e.is_fatal() => abort_on_corruption(&e),
        Err(e) => {
            log::error!("archive '{}': {}", binary.display(), e);
            error_to_exit_code(&e)
        }
    }
}

/// Restore command implementation
pub fn restore(binary: &Path) -> ExitCode {
    match gar::restore(binary) {
        Ok(size) => {
            log::info!("trimmed '{}' to {} bytes", binary.display(), size);
            ExitCode::Success
        }
        Err(e) => {
            log::error!("restore '{}': {}", binary.display(), e);
            error_to_exit_code(&e)
        }
    }
}

/// Extract command implementation
pub fn extract(binary: &Path, names: &[String], output_dir: &Path) -> ExitCode {
    let fs = match open_filesystem(binary) {
        Ok(fs) => fs,
        Err(code) => return code,
    };

    let result = gar::extract(&fs, names, output_dir);
    close_filesystem(&fs);

    match result {
        Ok(result) => {
            print!("{}", format_extract_result(&result));
            if result.is_ok() {
                ExitCode::Success
            } else {
                ExitCode::Warning
            }
        }
        Err(e) => {
            log::error!("extract from '{}': {}", binary.display(), e);
            error_to_exit_code(&e)
        }
    }
}

fn open_filesystem(binary: &Path) -> Result<FileSystem, ExitCode> {
    FileSystem::open_path(binary).map_err(|e| {
        log::error!("inspect file '{}': {}", binary.display(), e);
        error_to_exit_code(&e)
    })
}

fn close_filesystem(fs: &FileSystem) {
    if let Err(e) = fs.close() {
        log::warn!("close: {}", e);
    }
}

/// The binary could not be restored after a failed session; its contents
/// are unknown, so nothing else may run.
fn abort_on_corruption(error: &Error) -> ! {
    log::error!("{}", error);
    std::process::abort();
}
