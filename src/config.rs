//! Configuration types for recovery runs and terminal output

use std::num::NonZeroU64;
use std::path::PathBuf;

use crate::error::{RecoverError, Result};

/// Default maximum destination path length, in bytes.
pub const DEFAULT_MAX_PATH_LEN: usize = 255;

/// Free-space floor for single file and folder recovery (MB).
pub const DEFAULT_ITEM_FLOOR_MB: NonZeroU64 = NonZeroU64::new(100).unwrap();

/// Free-space floor for bulk extension recovery (MB).
pub const DEFAULT_BULK_FLOOR_MB: NonZeroU64 = NonZeroU64::new(5000).unwrap();

/// Settings shared by every operation of a [`CopyEngine`](crate::CopyEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverConfig {
    /// Free space required before `recover_file` starts
    pub file_floor_mb: NonZeroU64,
    /// Free space required before `recover_folder` starts
    pub folder_floor_mb: NonZeroU64,
    /// Free space required before `recover_by_extension` starts
    pub extension_floor_mb: NonZeroU64,
    /// Destination paths longer than this are shortened
    pub max_path_len: usize,
    /// Directory receiving the audit log files
    pub log_dir: PathBuf,
}

impl Default for RecoverConfig {
    fn default() -> Self {
        Self {
            file_floor_mb: DEFAULT_ITEM_FLOOR_MB,
            folder_floor_mb: DEFAULT_ITEM_FLOOR_MB,
            extension_floor_mb: DEFAULT_BULK_FLOOR_MB,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            log_dir: PathBuf::from("."),
        }
    }
}

impl RecoverConfig {
    /// Use the same free-space floor for every operation.
    pub fn with_floor(mut self, floor_mb: NonZeroU64) -> Self {
        self.file_floor_mb = floor_mb;
        self.folder_floor_mb = floor_mb;
        self.extension_floor_mb = floor_mb;
        self
    }

    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<()> {
        if self.max_path_len == 0 {
            return Err(RecoverError::InvalidConfig(
                "max_path_len must be greater than zero".to_string(),
            ));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(RecoverError::InvalidConfig(
                "log_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress diagnostics on stderr
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
}
