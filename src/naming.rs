//! Collision-safe and length-bounded destination names.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::utils::collision_stamp;

/// Return `desired` if nothing exists there, otherwise a sibling name carrying
/// a `_YYYYMMDD_HHMMSS` stamp before the extension.
///
/// Several collisions within the same second fall through to a numeric
/// counter after the stamp (`name_20240101_120000_1.txt`, `_2`, ...).
pub fn unique_name(desired: &Path) -> PathBuf {
    unique_name_with_stamp(desired, &collision_stamp(Local::now()))
}

pub(crate) fn unique_name_with_stamp(desired: &Path, stamp: &str) -> PathBuf {
    if !exists_or_dangling(desired) {
        return desired.to_path_buf();
    }
    let mut counter = 0;
    loop {
        let candidate = stamped_name(desired, stamp, counter);
        if !exists_or_dangling(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// `desired` with `_<stamp>` (and `_<counter>` when non-zero) inserted
/// before the extension.
fn stamped_name(desired: &Path, stamp: &str, counter: usize) -> PathBuf {
    let mut name = desired.file_stem().map(OsString::from).unwrap_or_default();
    name.push("_");
    name.push(stamp);
    if counter > 0 {
        name.push(format!("_{counter}"));
    }
    if let Some(extension) = desired.extension() {
        name.push(".");
        name.push(extension);
    }
    desired.with_file_name(name)
}

/// Shorten `path` to at most `max_len` bytes, keeping its final segment intact.
pub fn shorten_path(path: &Path, max_len: usize) -> PathBuf {
    shorten_path_within(path, Path::new(""), max_len)
}

/// Same as [`shorten_path`], but never truncates a component of `floor`.
///
/// The parent directory receives a budget of `max_len` minus the final
/// segment and one separator. Within that budget the deepest directory
/// component is truncated first, down to a single character, before moving
/// on to its parent. When the bound cannot be met the best-effort path is
/// returned.
pub fn shorten_path_within(path: &Path, floor: &Path, max_len: usize) -> PathBuf {
    if path_len(path) <= max_len {
        return path.to_path_buf();
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let budget = max_len.saturating_sub(name.len() + separator_len(parent));
    shorten_dir(parent, floor, budget).join(name)
}

fn shorten_dir(dir: &Path, floor: &Path, budget: usize) -> PathBuf {
    if path_len(dir) <= budget || dir == floor {
        return dir.to_path_buf();
    }
    let (Some(parent), Some(name)) = (dir.parent(), dir.file_name()) else {
        return dir.to_path_buf();
    };
    let prefix_len = path_len(parent) + separator_len(parent);

    // Non UTF-8 names are kept whole; only their ancestors can shrink.
    let Some(name) = name.to_str() else {
        let parent_budget = budget.saturating_sub(name.len() + separator_len(parent));
        return shorten_dir(parent, floor, parent_budget).join(name);
    };

    let room = budget.saturating_sub(prefix_len);
    if room > 0 {
        let truncated = truncate_name(name, room);
        if prefix_len + truncated.len() <= budget {
            return parent.join(truncated);
        }
    }
    let minimal = truncate_name(name, 1);
    let parent_budget = budget.saturating_sub(minimal.len() + separator_len(parent));
    shorten_dir(parent, floor, parent_budget).join(minimal)
}

/// Longest prefix of `name` within `max_bytes`, never splitting a character
/// and never shorter than one character.
fn truncate_name(name: &str, max_bytes: usize) -> &str {
    let mut end = 0;
    for (idx, ch) in name.char_indices() {
        let next = idx + ch.len_utf8();
        if next > max_bytes {
            break;
        }
        end = next;
    }
    if end == 0 {
        end = name.chars().next().map_or(0, char::len_utf8);
    }
    &name[..end]
}

fn path_len(path: &Path) -> usize {
    path.as_os_str().len()
}

/// Bytes `parent.join(child)` inserts between the two.
fn separator_len(parent: &Path) -> usize {
    let raw = parent.as_os_str();
    if raw.is_empty() || raw.to_string_lossy().ends_with(std::path::is_separator) {
        0
    } else {
        1
    }
}

fn exists_or_dangling(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Destination naming policy bound to one maximum path length.
#[derive(Debug, Clone, Copy)]
pub struct NameResolver {
    max_path_len: usize,
}

impl NameResolver {
    pub fn new(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    pub fn max_path_len(&self) -> usize {
        self.max_path_len
    }

    /// Unique, length-bounded destination for `desired`, never truncating
    /// components of `floor`.
    ///
    /// Every candidate name is shortened before its existence is checked, so
    /// a stamped name gets its own, tighter budget for the parent.
    pub fn resolve(&self, desired: &Path, floor: &Path) -> PathBuf {
        self.resolve_with_stamp(desired, floor, &collision_stamp(Local::now()))
    }

    fn resolve_with_stamp(&self, desired: &Path, floor: &Path, stamp: &str) -> PathBuf {
        let fit = |path: &Path| shorten_path_within(path, floor, self.max_path_len);
        let plain = fit(desired);
        if !exists_or_dangling(&plain) {
            return plain;
        }
        let mut counter = 0;
        loop {
            let candidate = fit(&stamped_name(desired, stamp, counter));
            if !exists_or_dangling(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}
