//! Entry-name normalization.
//!
//! Entry names are the keys of the embedded directory, so the same source
//! file must always produce the same name. A name is derived from the path
//! given to [`Archiver::add`](crate::Archiver::add) by:
//!
//! 1. converting the platform separator to `/`,
//! 2. lexically cleaning the path (collapsing `.`, `..` and repeated slashes),
//! 3. stripping leading slashes so the name is always relative.
//!
//! ```
//! use gar::archive_path::clean_str;
//!
//! assert_eq!(clean_str("./cfg//a.txt"), "cfg/a.txt");
//! assert_eq!(clean_str("/etc/app/../app.conf"), "etc/app.conf");
//! assert_eq!(clean_str("../shared/data.bin"), "../shared/data.bin");
//! ```
//!
//! Names produced this way may still begin with `..` segments when the source
//! lives outside the working directory; extraction refuses such names (see
//! [`escapes_root`]).

use std::path::Path;

use crate::{Error, Result};

/// Lexically cleans a slash-separated path and makes it relative.
///
/// Never touches the filesystem. `..` segments that would climb above a
/// rooted path are dropped; on a relative path they are kept.
pub fn clean_str(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Derives the entry name for a source path.
///
/// # Errors
///
/// Returns [`Error::InvalidArchivePath`] if the path is not valid UTF-8,
/// contains a NUL byte, or cleans down to nothing (e.g. `.` or `/`).
pub fn clean_name(path: &Path) -> Result<String> {
    let raw = path.to_str().ok_or_else(|| {
        Error::InvalidArchivePath(format!("not valid UTF-8: {}", path.display()))
    })?;
    normalize(raw)
}

/// Same as [`clean_name`] for names that do not come from a filesystem path.
pub(crate) fn normalize(raw: &str) -> Result<String> {
    if raw.contains('\0') {
        return Err(Error::InvalidArchivePath("contains NUL byte".into()));
    }

    let slashed = if std::path::MAIN_SEPARATOR == '/' {
        raw.to_string()
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    };

    let name = clean_str(&slashed);
    if name.is_empty() {
        return Err(Error::InvalidArchivePath(format!(
            "'{}' does not name a file",
            raw
        )));
    }
    Ok(name)
}

/// Returns true if extracting `name` under a directory would leave it.
///
/// That is the case for absolute names, names with a Windows drive or UNC
/// prefix, and names with any `..` segment.
pub fn escapes_root(name: &str) -> bool {
    if name.starts_with('/') || name.starts_with('\\') {
        return true;
    }
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }
    name.split(['/', '\\']).any(|segment| segment == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_simple() {
        assert_eq!(clean_str("a.txt"), "a.txt");
        assert_eq!(clean_str("cfg/a.txt"), "cfg/a.txt");
    }

    #[test]
    fn test_clean_dots_and_slashes() {
        assert_eq!(clean_str("./a/./b//c"), "a/b/c");
        assert_eq!(clean_str("a/b/../c"), "a/c");
        assert_eq!(clean_str("a/b/c/../../d"), "a/d");
        assert_eq!(clean_str("a/b/"), "a/b");
    }

    #[test]
    fn test_clean_leading_parent() {
        assert_eq!(clean_str("../a"), "../a");
        assert_eq!(clean_str("../../a/b"), "../../a/b");
        assert_eq!(clean_str("a/../../b"), "../b");
    }

    #[test]
    fn test_clean_rooted() {
        assert_eq!(clean_str("/a/b"), "a/b");
        assert_eq!(clean_str("//a//b"), "a/b");
        assert_eq!(clean_str("/../a"), "a");
        assert_eq!(clean_str("/"), "");
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name(Path::new("data/b.bin")).unwrap(), "data/b.bin");
        assert_eq!(clean_name(Path::new("/tmp/x/../y.txt")).unwrap(), "tmp/y.txt");
    }

    #[test]
    fn test_clean_name_rejects_empty() {
        assert!(matches!(
            clean_name(Path::new(".")),
            Err(Error::InvalidArchivePath(_))
        ));
        assert!(matches!(
            clean_name(Path::new("/")),
            Err(Error::InvalidArchivePath(_))
        ));
        assert!(matches!(normalize(""), Err(Error::InvalidArchivePath(_))));
    }

    #[test]
    fn test_normalize_rejects_nul() {
        assert!(matches!(
            normalize("a\0b"),
            Err(Error::InvalidArchivePath(_))
        ));
    }

    #[cfg(windows)]
    #[test]
    fn test_clean_name_windows_separators() {
        assert_eq!(clean_name(Path::new(r"cfg\a.txt")).unwrap(), "cfg/a.txt");
    }

    #[test]
    fn test_escapes_root() {
        assert!(!escapes_root("cfg/a.txt"));
        assert!(!escapes_root("a..b/c"));
        assert!(escapes_root("../a"));
        assert!(escapes_root("a/../../b"));
        assert!(escapes_root("/etc/passwd"));
        assert!(escapes_root("C:/Windows"));
        assert!(escapes_root("a\\..\\b"));
    }
}
