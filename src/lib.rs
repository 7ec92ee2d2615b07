//! rescopy - recovery copy library
//!
//! Copies single files, folder trees or files selected by extension from
//! unreliable storage to a destination. Nothing at the destination is ever
//! overwritten and every transfer is recorded in a per-operation audit log.

pub mod args;
pub mod audit;
pub mod capacity;
pub mod config;
pub mod copy;
pub mod error;
pub mod naming;
pub mod stats;
pub mod utils;
pub mod walker;

mod engine;

pub use audit::{AuditSink, AuditStore, LogDirectory, MemoryAudit};
pub use capacity::{CapacityGuard, FixedSpace, SpaceProbe, SystemSpace};
pub use config::{OutputConfig, RecoverConfig};
pub use engine::{CopyEngine, FILE_LABEL, FOLDER_LABEL};
pub use error::{RecoverError, Result};
pub use naming::NameResolver;
pub use stats::{CopyOutcome, CopyStatus, ExtensionRecovery, MapReport, RecoveryReport};
pub use walker::{DirectoryMode, EntryKind, PathItem, TreeWalker, WalkSummary};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "rescopy";
