use std::fmt;
use std::path::{Path, PathBuf};

use crate::walker::WalkSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    Success,
    Failed,
}

/// Result of one file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: CopyStatus,
    pub bytes: u64,
    pub error_detail: Option<String>,
}

impl CopyOutcome {
    pub fn success(source: &Path, destination: &Path, bytes: u64) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            status: CopyStatus::Success,
            bytes,
            error_detail: None,
        }
    }

    pub fn failed(source: &Path, destination: &Path, detail: String) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            status: CopyStatus::Failed,
            bytes: 0,
            error_detail: Some(detail),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CopyStatus::Success
    }
}

/// Outcomes and traversal counters of one folder or extension run.
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub outcomes: Vec<CopyOutcome>,
    pub walk: WalkSummary,
}

impl RecoveryReport {
    pub fn push(&mut self, outcome: CopyOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn files_recovered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn files_failed(&self) -> usize {
        self.outcomes.len() - self.files_recovered()
    }

    pub fn bytes_recovered(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_clean(&self) -> bool {
        self.files_failed() == 0 && self.walk.dirs_failed == 0 && self.walk.dirs_unreadable == 0
    }
}

impl fmt::Display for RecoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Statistics: files recovered={} failed={} bytes={} directories created={} \
             failed={} unreadable={} cycles skipped={}",
            self.files_recovered(),
            self.files_failed(),
            self.bytes_recovered(),
            self.walk.dirs_created,
            self.walk.dirs_failed,
            self.walk.dirs_unreadable,
            self.walk.cycles_skipped
        )
    }
}

/// Per-extension slice of an extension recovery run.
#[derive(Debug, Clone)]
pub struct ExtensionRecovery {
    pub extension: String,
    pub folder: PathBuf,
    pub report: RecoveryReport,
}

/// Entries listed by a folder map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapReport {
    pub log_file: String,
    pub directories: usize,
    pub files: usize,
}
