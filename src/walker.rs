//! Iterative directory traversal mirroring a source tree into a destination.
//!
//! Pending directories live on an explicit LIFO work-list, so tree depth is
//! bounded by heap memory rather than by the call stack. The walk is
//! depth-first; sibling order is whatever the filesystem reports and is not
//! guaranteed to be stable between runs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audit::AuditSink;
use crate::error::RecoverError;
use crate::utils::relative_display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One traversal step: a source entry and where it lands in the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathItem {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: EntryKind,
}

/// A directory pair waiting to be expanded.
#[derive(Debug)]
struct WorkItem {
    source_dir: PathBuf,
    dest_dir: PathBuf,
}

/// How destination directories are handled while walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryMode {
    /// Create every visited directory in the destination.
    Mirror,
    /// Leave the destination untouched; the visitor creates what it needs.
    OnDemand,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub dirs_visited: usize,
    pub dirs_created: usize,
    pub dirs_failed: usize,
    pub dirs_unreadable: usize,
    pub cycles_skipped: usize,
    pub files_seen: usize,
}

/// Identity used to detect directories reached twice (symlink cycles).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DirIdentity {
    #[cfg(unix)]
    Inode { dev: u64, ino: u64 },
    #[cfg_attr(unix, allow(dead_code))]
    Canonical(PathBuf),
}

fn dir_identity(path: &Path) -> Option<DirIdentity> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let meta = fs::metadata(path).ok()?;
        Some(DirIdentity::Inode {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }
    #[cfg(not(unix))]
    {
        fs::canonicalize(path).ok().map(DirIdentity::Canonical)
    }
}

#[derive(Debug, Clone)]
pub struct TreeWalker {
    source_root: PathBuf,
    dest_root: PathBuf,
    mode: DirectoryMode,
    skip: Vec<PathBuf>,
}

impl TreeWalker {
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            mode: DirectoryMode::Mirror,
            skip: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: DirectoryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Treat `dir` as already visited, so the walk never descends into it.
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skip.push(dir.into());
        self
    }

    /// Walk the tree, handing every entry to `visit` as soon as it is listed.
    ///
    /// Directories are reported after their destination counterpart was
    /// ensured (in [`DirectoryMode::Mirror`]) and before their children.
    /// Anything that is not a directory, including dangling links, is
    /// reported as [`EntryKind::File`]. Failures to list or create a
    /// directory are recorded in `audit` and the walk continues.
    pub fn walk<F>(&self, audit: &dyn AuditSink, mut visit: F) -> WalkSummary
    where
        F: FnMut(&PathItem),
    {
        let mut summary = WalkSummary::default();
        let mut visited: HashSet<DirIdentity> = HashSet::new();
        for dir in std::iter::once(&self.source_root).chain(self.skip.iter()) {
            if let Some(identity) = dir_identity(dir) {
                visited.insert(identity);
            }
        }

        let mut pending = vec![WorkItem {
            source_dir: self.source_root.clone(),
            dest_dir: self.dest_root.clone(),
        }];
        while let Some(work) = pending.pop() {
            summary.dirs_visited += 1;
            let entries = match fs::read_dir(&work.source_dir) {
                Ok(entries) => entries,
                Err(error) => {
                    audit.error(&format!(
                        "Failed to read directory: {}. Error: {error}",
                        work.source_dir.display()
                    ));
                    summary.dirs_unreadable += 1;
                    continue;
                }
            };

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(error) => {
                        audit.error(&format!(
                            "Failed to read entry under {}. Error: {error}",
                            work.source_dir.display()
                        ));
                        continue;
                    }
                };
                let source = entry.path();
                let destination = work.dest_dir.join(entry.file_name());

                // follows symlinks, like the copy itself
                if !source.is_dir() {
                    summary.files_seen += 1;
                    visit(&PathItem {
                        source,
                        destination,
                        kind: EntryKind::File,
                    });
                    continue;
                }

                if let Some(identity) = dir_identity(&source) {
                    if !visited.insert(identity) {
                        audit.info(&format!(
                            "Skipping already visited directory: {}",
                            source.display()
                        ));
                        summary.cycles_skipped += 1;
                        continue;
                    }
                }
                if self.mode == DirectoryMode::Mirror {
                    self.ensure_dir(&destination, audit, &mut summary);
                }
                let item = PathItem {
                    source,
                    destination,
                    kind: EntryKind::Directory,
                };
                visit(&item);
                pending.push(WorkItem {
                    source_dir: item.source,
                    dest_dir: item.destination,
                });
            }
        }
        summary
    }

    fn ensure_dir(&self, dir: &Path, audit: &dyn AuditSink, summary: &mut WalkSummary) {
        if dir.is_dir() {
            return;
        }
        match fs::create_dir_all(dir) {
            Ok(()) => {
                summary.dirs_created += 1;
                audit.info(&format!(
                    "Created directory: {}",
                    relative_display(dir, &self.dest_root)
                ));
            }
            Err(source) => {
                summary.dirs_failed += 1;
                let error = RecoverError::DirectoryCreateFailed {
                    path: dir.to_path_buf(),
                    source,
                };
                audit.error(&error.to_string());
            }
        }
    }
}
