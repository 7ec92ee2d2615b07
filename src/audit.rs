//! Audit trail sinks for recovery runs.
//!
//! Every operation writes its events to one sink obtained from an
//! [`AuditStore`]. Sinks are plain values handed to the engine, so nothing
//! here touches process-wide logging state; records are additionally mirrored
//! to `tracing` under this module's target.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::error::{RecoverError, Result};
use crate::utils::format_log_time;

/// Severity of one audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Error,
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub level: AuditLevel,
    pub message: String,
}

/// Append-only receiver of audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, level: AuditLevel, message: &str);

    fn info(&self, message: &str) {
        self.record(AuditLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.record(AuditLevel::Error, message);
    }
}

/// Source of per-operation sinks, keyed by log file name.
pub trait AuditStore: Send + Sync {
    /// Open the sink named `name`. With `fresh`, earlier content is discarded.
    fn open(&self, name: &str, fresh: bool) -> Result<Arc<dyn AuditSink>>;
}

/// Log name for a recovery operation label (`.file`, `.folder`, `.jpg`, ...).
pub fn recovery_log_name(label: &str) -> String {
    format!("recovery_log_{label}.txt")
}

/// Log name for a directory listing of `folder_name`.
pub fn folder_map_log_name(folder_name: &str) -> String {
    format!("folder_map_{folder_name}_log.txt")
}

fn mirror(level: AuditLevel, message: &str) {
    match level {
        AuditLevel::Info => tracing::info!("{message}"),
        AuditLevel::Error => tracing::error!("{message}"),
    }
}

/// Sink appending `time - LEVEL - message` lines to a file.
pub struct FileAudit {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAudit {
    pub fn open(path: &Path, fresh: bool) -> Result<Self> {
        let open_err = |source| RecoverError::AuditOpen {
            path: path.to_path_buf(),
            source,
        };
        if fresh {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(open_err(error)),
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAudit {
    fn record(&self, level: AuditLevel, message: &str) {
        mirror(level, message);
        let written = match self.file.lock() {
            Ok(mut file) => writeln!(
                file,
                "{} - {} - {}",
                format_log_time(Local::now()),
                level,
                message
            ),
            Err(_) => Err(io::Error::other("audit file lock poisoned")),
        };
        if let Err(error) = written {
            tracing::warn!(
                "failed to write audit record to {}: {error}",
                self.path.display()
            );
        }
    }
}

/// Store placing every log file inside one directory.
#[derive(Debug, Clone)]
pub struct LogDirectory {
    dir: PathBuf,
}

impl LogDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl AuditStore for LogDirectory {
    fn open(&self, name: &str, fresh: bool) -> Result<Arc<dyn AuditSink>> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|source| RecoverError::AuditOpen {
                path: self.dir.clone(),
                source,
            })?;
        }
        Ok(Arc::new(FileAudit::open(&self.path_of(name), fresh)?))
    }
}

/// In-memory sink; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemorySink {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == AuditLevel::Error)
            .map(|e| e.message)
            .collect()
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl AuditSink for MemorySink {
    fn record(&self, level: AuditLevel, message: &str) {
        mirror(level, message);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(AuditEntry {
                level,
                message: message.to_string(),
            });
        }
    }
}

/// In-memory store, useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAudit {
    sinks: Arc<Mutex<BTreeMap<String, MemorySink>>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink registered under `name`, if any operation opened it.
    pub fn sink(&self, name: &str) -> Option<MemorySink> {
        self.sinks.lock().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.sinks
            .lock()
            .map(|sinks| sinks.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl AuditStore for MemoryAudit {
    fn open(&self, name: &str, fresh: bool) -> Result<Arc<dyn AuditSink>> {
        let mut sinks = self.sinks.lock().map_err(|_| RecoverError::AuditOpen {
            path: PathBuf::from(name),
            source: io::Error::other("audit store lock poisoned"),
        })?;
        let sink = sinks.entry(name.to_string()).or_default().clone();
        if fresh {
            sink.clear();
        }
        Ok(Arc::new(sink))
    }
}
