//! Error taxonomy for recovery runs.
//!
//! Pre-flight variants abort an invocation before anything is written to the
//! destination. Per-item variants are only ever rendered into the audit log
//! and into [`CopyOutcome`](crate::stats::CopyOutcome) details.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RecoverError {
    #[error("Source does not exist: {}", .path.display())]
    SourceMissing { path: PathBuf },

    #[error(
        "Not enough free space on the destination drive {}: {required_mb} MB required, {} available",
        .path.display(),
        display_megabytes(.available_mb)
    )]
    InsufficientSpace {
        path: PathBuf,
        required_mb: u64,
        available_mb: Option<u64>,
    },

    #[error("Failed to recover: {}. Error: {source}", .path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create directory: {}. Error: {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "Cannot recover into a directory inside the source: {} -> {}",
        .source_path.display(),
        .destination.display()
    )]
    DestinationInsideSource {
        source_path: PathBuf,
        destination: PathBuf,
    },

    #[error("Failed to open audit log {}: {source}", .path.display())]
    AuditOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RecoverError {
    /// True for errors that abort an invocation before any copy starts.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::SourceMissing { .. }
                | Self::InsufficientSpace { .. }
                | Self::DestinationInsideSource { .. }
                | Self::AuditOpen { .. }
                | Self::InvalidConfig(_)
        )
    }
}

fn display_megabytes(megabytes: &Option<u64>) -> String {
    match megabytes {
        Some(mb) => format!("{mb} MB"),
        None => "unknown".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, RecoverError>;
