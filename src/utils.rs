use std::path::Path;

use chrono::{DateTime, Local};
use glob::Pattern;

/// Suffix stamp used to disambiguate destination names, e.g. `20240101_120000`.
pub fn collision_stamp(time: DateTime<Local>) -> String {
    time.format("%Y%m%d_%H%M%S").to_string()
}

/// Timestamp prefix of one audit log line, e.g. `2024-01-01 12:00:00,042`.
pub fn format_log_time(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S,%3f").to_string()
}

/// True when `entry_name` ends with `extension`.
///
/// The comparison is case-sensitive and literal: glob metacharacters inside
/// the extension are escaped before matching.
pub fn matches_extension(entry_name: &str, extension: &str) -> bool {
    if extension.is_empty() {
        return false;
    }
    match Pattern::new(&format!("*{}", Pattern::escape(extension))) {
        Ok(pattern) => pattern.matches(entry_name),
        Err(_) => entry_name.ends_with(extension),
    }
}

/// Name of the destination folder collecting one extension's files.
pub fn extension_folder_name(extension: &str) -> String {
    format!("Recovered {} Files", extension.to_uppercase())
}

/// Relative display of `path` under `root`, falling back to the full path.
pub fn relative_display(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => path.display().to_string(),
    }
}
