//! Output formatting for CLI operations.

use gar::{ArchiveResult, ExtractResult, FileInfo};

/// Formats the inspect listing: the binary size, then one line per entry
/// sorted by name.
pub fn format_inspect(binary_size: u64, entries: &[FileInfo]) -> String {
    let mut sorted: Vec<&FileInfo> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut output = format!("Size of binary: {}\n", binary_size);
    for info in sorted {
        output.push_str(&format!("  {} => {}\n", info.name, info.size));
    }
    output
}

/// Formats the summary of a successful archive session.
pub fn format_archive_result(result: &ArchiveResult) -> String {
    format!(
        "Archived {} file(s): {} + {} + trailer = {}\n",
        result.entries_written,
        humanize_bytes(result.original_size),
        humanize_bytes(result.container_size),
        humanize_bytes(result.total_size)
    )
}

/// Formats extraction results
pub fn format_extract_result(result: &ExtractResult) -> String {
    let mut output = format!(
        "Extracted {} file(s), {}\n",
        result.entries_extracted,
        humanize_bytes(result.bytes_extracted)
    );

    if result.entries_failed > 0 {
        output.push_str(&format!("Failed: {} file(s)\n", result.entries_failed));
        for (name, error) in &result.failures {
            output.push_str(&format!("  {}: {}\n", name, error));
        }
    }
    output
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
