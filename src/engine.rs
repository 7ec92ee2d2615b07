use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audit::{AuditSink, AuditStore, folder_map_log_name, recovery_log_name};
use crate::capacity::{CapacityGuard, CapacityRequirement};
use crate::config::RecoverConfig;
use crate::copy::copy_file_with_metadata;
use crate::error::{RecoverError, Result};
use crate::naming::NameResolver;
use crate::stats::{CopyOutcome, ExtensionRecovery, MapReport, RecoveryReport};
use crate::utils::{extension_folder_name, matches_extension};
use crate::walker::{DirectoryMode, EntryKind, TreeWalker};

/// Label of the single-file recovery log.
pub const FILE_LABEL: &str = ".file";
/// Label of the folder recovery log.
pub const FOLDER_LABEL: &str = ".folder";

pub struct CopyEngine {
    config: RecoverConfig,
    capacity: CapacityGuard,
    names: NameResolver,
    audit: Arc<dyn AuditStore>,
}

impl CopyEngine {
    pub fn new(
        config: RecoverConfig,
        capacity: CapacityGuard,
        audit: Arc<dyn AuditStore>,
    ) -> Result<Self> {
        config.validate()?;
        let names = NameResolver::new(config.max_path_len);
        Ok(Self {
            config,
            capacity,
            names,
            audit,
        })
    }

    pub fn config(&self) -> &RecoverConfig {
        &self.config
    }

    /// Copy one regular file into `dest_dir`.
    ///
    /// Missing source and insufficient space are returned as errors before
    /// anything is written. A failed transfer is reported through the
    /// returned outcome.
    pub fn recover_file(&self, source_file: &Path, dest_dir: &Path) -> Result<CopyOutcome> {
        let audit = self.audit.open(&recovery_log_name(FILE_LABEL), false)?;
        if !source_file.is_file() {
            return Err(fail(
                audit.as_ref(),
                RecoverError::SourceMissing {
                    path: source_file.to_path_buf(),
                },
            ));
        }
        self.ensure_capacity(dest_dir, self.config.file_floor_mb, audit.as_ref())?;
        ensure_destination_dir(dest_dir, audit.as_ref());

        let file_name = source_file
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("recovered"));
        Ok(self.transfer(
            source_file,
            &dest_dir.join(file_name),
            dest_dir,
            audit.as_ref(),
        ))
    }

    /// Mirror `source_folder` into `dest_folder/<source folder name>`.
    pub fn recover_folder(&self, source_folder: &Path, dest_folder: &Path) -> Result<RecoveryReport> {
        let audit = self.audit.open(&recovery_log_name(FOLDER_LABEL), false)?;
        if !source_folder.is_dir() {
            return Err(fail(
                audit.as_ref(),
                RecoverError::SourceMissing {
                    path: source_folder.to_path_buf(),
                },
            ));
        }
        self.ensure_capacity(dest_folder, self.config.folder_floor_mb, audit.as_ref())?;
        let target = dest_folder.join(folder_name(source_folder));
        ensure_not_nested(source_folder, &target, audit.as_ref())?;

        ensure_destination_dir(&target, audit.as_ref());
        audit.info(&format!(
            "Recovery process started for folder {} to {}",
            source_folder.display(),
            target.display()
        ));

        let mut report = RecoveryReport::default();
        let walk = TreeWalker::new(source_folder, &target)
            .skip_dir(&target)
            .walk(audit.as_ref(), |item| {
                if item.kind == EntryKind::File {
                    report.push(self.transfer(
                        &item.source,
                        &item.destination,
                        &target,
                        audit.as_ref(),
                    ));
                }
            });
        report.walk = walk;

        audit.info(&report.to_string());
        audit.info(&format!(
            "Successfully recovered folder: {} -> {}",
            source_folder.display(),
            target.display()
        ));
        Ok(report)
    }

    /// Copy every file whose name ends with one of `extensions` into a
    /// `Recovered <EXT> Files` folder per extension, keeping relative paths.
    pub fn recover_by_extension(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        extensions: &[String],
    ) -> Result<Vec<ExtensionRecovery>> {
        let mut requested: Vec<&str> = Vec::new();
        for extension in extensions.iter().map(String::as_str) {
            if !extension.is_empty() && !requested.contains(&extension) {
                requested.push(extension);
            }
        }
        let sinks = requested
            .iter()
            .map(|extension| self.audit.open(&recovery_log_name(extension), false))
            .collect::<Result<Vec<_>>>()?;
        let fail_all = |error: RecoverError| {
            for sink in &sinks {
                sink.error(&error.to_string());
            }
            error
        };

        if !source_dir.is_dir() {
            return Err(fail_all(RecoverError::SourceMissing {
                path: source_dir.to_path_buf(),
            }));
        }
        let requirement = CapacityRequirement::new(dest_dir, self.config.extension_floor_mb);
        if let Err(error) = self.evaluate(&requirement) {
            return Err(fail_all(error));
        }
        if let Err(error) = nested_check(source_dir, dest_dir) {
            return Err(fail_all(error));
        }

        let mut results = Vec::with_capacity(requested.len());
        for (extension, audit) in requested.into_iter().zip(sinks.iter()) {
            let audit = audit.as_ref();
            let folder = dest_dir.join(extension_folder_name(extension));
            ensure_destination_dir(&folder, audit);
            audit.info(&format!(
                "Recovery process started for {} files from {} to {}",
                extension.to_uppercase(),
                source_dir.display(),
                folder.display()
            ));

            let mut report = RecoveryReport::default();
            let walk = TreeWalker::new(source_dir, &folder)
                .mode(DirectoryMode::OnDemand)
                .skip_dir(dest_dir)
                .walk(audit, |item| {
                    let matched = item.kind == EntryKind::File
                        && item
                            .source
                            .file_name()
                            .and_then(|name| name.to_str())
                            .is_some_and(|name| matches_extension(name, extension));
                    if matched {
                        report.push(self.transfer(&item.source, &item.destination, &folder, audit));
                    }
                });
            report.walk = walk;

            audit.info(&report.to_string());
            audit.info(&format!(
                "Recovery process completed for {} files. Total files recovered: {}",
                extension.to_uppercase(),
                report.files_recovered()
            ));
            results.push(ExtensionRecovery {
                extension: extension.to_string(),
                folder,
                report,
            });
        }
        Ok(results)
    }

    /// List every directory and file under `dir` into a fresh
    /// `folder_map_<name>_log.txt`.
    pub fn map_folder(&self, dir: &Path) -> Result<MapReport> {
        let log_file = folder_map_log_name(&folder_name(dir).to_string_lossy());
        let audit = self.audit.open(&log_file, true)?;
        if !dir.is_dir() {
            return Err(fail(
                audit.as_ref(),
                RecoverError::SourceMissing {
                    path: dir.to_path_buf(),
                },
            ));
        }
        audit.info(&format!("Scanning directory: {}", dir.display()));

        let mut report = MapReport {
            log_file,
            ..MapReport::default()
        };
        TreeWalker::new(dir, "")
            .mode(DirectoryMode::OnDemand)
            .walk(audit.as_ref(), |item| match item.kind {
                EntryKind::Directory => {
                    report.directories += 1;
                    audit.info(&format!("Directory: {}", item.destination.display()));
                }
                EntryKind::File => {
                    report.files += 1;
                    audit.info(&format!("File: {}", item.destination.display()));
                }
            });
        audit.info("Directory scan completed.");
        Ok(report)
    }

    fn ensure_capacity(
        &self,
        dir: &Path,
        required_mb: NonZeroU64,
        audit: &dyn AuditSink,
    ) -> Result<()> {
        self.evaluate(&CapacityRequirement::new(dir, required_mb))
            .map_err(|error| fail(audit, error))
    }

    fn evaluate(&self, requirement: &CapacityRequirement) -> Result<()> {
        let insufficient = |available_mb| RecoverError::InsufficientSpace {
            path: requirement.target_directory.clone(),
            required_mb: requirement.required_mb.get(),
            available_mb,
        };
        match self.capacity.check(requirement) {
            Ok(check) if check.sufficient => Ok(()),
            Ok(check) => Err(insufficient(Some(check.available_mb))),
            Err(error) => {
                tracing::warn!(
                    "free space query failed for {}: {error}",
                    requirement.target_directory.display()
                );
                Err(insufficient(None))
            }
        }
    }

    /// Copy one file to a collision-free, length-bounded name derived from
    /// `desired`. Never fails; errors end up in the outcome and the audit log.
    fn transfer(
        &self,
        source: &Path,
        desired: &Path,
        floor: &Path,
        audit: &dyn AuditSink,
    ) -> CopyOutcome {
        let destination = self.names.resolve(desired, floor);
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                if let Err(source) = fs::create_dir_all(parent) {
                    let error = RecoverError::DirectoryCreateFailed {
                        path: parent.to_path_buf(),
                        source,
                    };
                    audit.error(&error.to_string());
                }
            }
        }

        match copy_file_with_metadata(source, &destination) {
            Ok(bytes) => {
                audit.info(&format!(
                    "Recovered: {} -> {}",
                    source.display(),
                    destination.display()
                ));
                CopyOutcome::success(source, &destination, bytes)
            }
            Err(cause) => {
                let error = RecoverError::CopyFailed {
                    path: source.to_path_buf(),
                    source: cause,
                };
                let detail = error.to_string();
                audit.error(&detail);
                CopyOutcome::failed(source, &destination, detail)
            }
        }
    }
}

impl std::fmt::Debug for CopyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyEngine")
            .field("config", &self.config)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

fn fail(audit: &dyn AuditSink, error: RecoverError) -> RecoverError {
    audit.error(&error.to_string());
    error
}

fn ensure_destination_dir(dir: &Path, audit: &dyn AuditSink) {
    if dir.is_dir() {
        return;
    }
    match fs::create_dir_all(dir) {
        Ok(()) => audit.info(&format!("Created directory: {}", dir.display())),
        Err(source) => {
            let error = RecoverError::DirectoryCreateFailed {
                path: dir.to_path_buf(),
                source,
            };
            audit.error(&error.to_string());
        }
    }
}

/// Base name used for the destination folder, resolving `.`/`..` and
/// trailing separators through the canonical path.
fn folder_name(path: &Path) -> PathBuf {
    if let Some(name) = path.file_name() {
        return PathBuf::from(name);
    }
    fs::canonicalize(path)
        .ok()
        .and_then(|canonical| canonical.file_name().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("root"))
}

/// Refuse destinations located inside the source tree.
fn nested_check(source: &Path, destination: &Path) -> Result<()> {
    let Ok(source_canonical) = fs::canonicalize(source) else {
        return Ok(());
    };
    let destination_canonical = canonical_prefix(destination);
    if destination_canonical.starts_with(&source_canonical) {
        return Err(RecoverError::DestinationInsideSource {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }
    Ok(())
}

fn ensure_not_nested(source: &Path, destination: &Path, audit: &dyn AuditSink) -> Result<()> {
    nested_check(source, destination).map_err(|error| fail(audit, error))
}

/// Canonical form of the longest existing ancestor, with the missing tail
/// appended unchanged.
fn canonical_prefix(path: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut current = path;
    loop {
        if let Ok(canonical) = fs::canonicalize(current) {
            let mut resolved = canonical;
            for component in tail.iter().rev() {
                resolved.push(component);
            }
            return resolved;
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                current = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAudit;
    use crate::capacity::FixedSpace;
    use crate::stats::CopyStatus;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn engine_with_space(mb: u64) -> (CopyEngine, MemoryAudit) {
        let audit = MemoryAudit::new();
        let engine = CopyEngine::new(
            RecoverConfig::default(),
            CapacityGuard::new(Box::new(FixedSpace::megabytes(mb))),
            Arc::new(audit.clone()),
        )
        .unwrap();
        (engine, audit)
    }

    fn folder_log(audit: &MemoryAudit) -> Vec<String> {
        audit
            .sink(&recovery_log_name(FOLDER_LABEL))
            .unwrap()
            .messages()
    }

    // src
    // |- a.txt
    // |- sub
    //    |- b.txt
    fn setup(root: &Path) -> PathBuf {
        let src = root.join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.txt"), "alpha").unwrap();
        fs::write(src.join("sub").join("b.txt"), "beta").unwrap();
        src
    }

    fn all_files(root: &Path) -> BTreeSet<PathBuf> {
        let mut found = BTreeSet::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    found.insert(path.strip_prefix(root).unwrap().to_path_buf());
                }
            }
        }
        found
    }

    #[test]
    fn folder_recovery_mirrors_the_tree() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let dst = tmp.path().join("dst");
        let (engine, audit) = engine_with_space(5 * 1024);

        let report = engine.recover_folder(&src, &dst).unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes.iter().all(CopyOutcome::is_success));
        assert_eq!(fs::read_to_string(dst.join("src/a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(dst.join("src/sub/b.txt")).unwrap(), "beta");
        assert!(report.is_clean());

        let log = folder_log(&audit);
        assert!(log.iter().any(|m| m.starts_with("Recovery process started for folder")));
        assert!(log.iter().any(|m| m.starts_with("Successfully recovered folder")));
    }

    #[test]
    fn rerun_keeps_existing_copies() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let dst = tmp.path().join("dst");
        let (engine, _audit) = engine_with_space(5 * 1024);

        engine.recover_folder(&src, &dst).unwrap();
        let second = engine.recover_folder(&src, &dst).unwrap();
        assert!(second.outcomes.iter().all(CopyOutcome::is_success));

        let files = all_files(&dst.join("src"));
        assert_eq!(files.len(), 4);
        let renamed = second
            .outcomes
            .iter()
            .find(|o| o.source.ends_with("a.txt"))
            .unwrap();
        let name = renamed.destination.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("a_") && name.ends_with(".txt"), "{name}");
        assert_eq!(fs::read_to_string(dst.join("src/a.txt")).unwrap(), "alpha");
    }

    #[test]
    fn insufficient_space_writes_nothing() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let dst = tmp.path().join("dst");
        let (engine, audit) = engine_with_space(99);

        let err = engine.recover_folder(&src, &dst).unwrap_err();
        assert!(matches!(
            err,
            RecoverError::InsufficientSpace {
                required_mb: 100,
                available_mb: Some(99),
                ..
            }
        ));
        assert!(!dst.exists());
        assert_eq!(
            audit
                .sink(&recovery_log_name(FOLDER_LABEL))
                .unwrap()
                .errors()
                .len(),
            1
        );

        let err = engine.recover_file(&src.join("a.txt"), &dst).unwrap_err();
        assert!(matches!(err, RecoverError::InsufficientSpace { .. }));
        assert!(!dst.exists());
    }

    #[test]
    fn missing_sources_are_fatal() {
        let tmp = tempdir().unwrap();
        let (engine, audit) = engine_with_space(5 * 1024);
        let dst = tmp.path().join("dst");

        let err = engine
            .recover_folder(&tmp.path().join("nope"), &dst)
            .unwrap_err();
        assert!(matches!(err, RecoverError::SourceMissing { .. }));

        let err = engine
            .recover_file(&tmp.path().join("nope.txt"), &dst)
            .unwrap_err();
        assert!(matches!(err, RecoverError::SourceMissing { .. }));

        // a directory is not a file
        let err = engine.recover_file(tmp.path(), &dst).unwrap_err();
        assert!(err.is_preflight());
        assert!(!dst.exists());
        assert_eq!(
            audit
                .sink(&recovery_log_name(FILE_LABEL))
                .unwrap()
                .errors()
                .len(),
            2
        );
    }

    #[test]
    fn single_file_recovery_creates_destination_and_avoids_collisions() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let dst = tmp.path().join("out").join("nested");
        let (engine, audit) = engine_with_space(200);

        let first = engine.recover_file(&src.join("a.txt"), &dst).unwrap();
        assert_eq!(first.status, CopyStatus::Success);
        assert_eq!(first.destination, dst.join("a.txt"));
        assert_eq!(first.bytes, 5);

        let second = engine.recover_file(&src.join("a.txt"), &dst).unwrap();
        assert!(second.is_success());
        assert_ne!(second.destination, first.destination);
        assert_eq!(fs::read_to_string(&second.destination).unwrap(), "alpha");

        let log = audit.sink(&recovery_log_name(FILE_LABEL)).unwrap().messages();
        assert_eq!(
            log.iter().filter(|m| m.starts_with("Recovered: ")).count(),
            2
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_does_not_stop_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let locked = src.join("sub").join("locked.txt");
        fs::write(&locked, "secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::File::open(&locked).is_ok() {
            // running with privileges that bypass permission bits
            return;
        }
        let dst = tmp.path().join("dst");
        let (engine, audit) = engine_with_space(5 * 1024);

        let report = engine.recover_folder(&src, &dst).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.files_recovered(), 2);
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].source, locked);
        assert!(failed[0].error_detail.is_some());
        assert!(!dst.join("src/sub/locked.txt").exists());
        assert!(folder_log(&audit)
            .iter()
            .any(|m| m.starts_with("Failed to recover: ")));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o600)).unwrap();
    }

    #[test]
    fn destination_inside_source_is_refused() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let (engine, _audit) = engine_with_space(5 * 1024);
        let err = engine
            .recover_folder(&src, &src.join("sub").join("backup"))
            .unwrap_err();
        assert!(matches!(err, RecoverError::DestinationInsideSource { .. }));
        assert!(!src.join("sub").join("backup").exists());
    }

    #[test]
    fn long_destination_paths_are_shortened_under_the_target() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let long = "n".repeat(120);
        let deep = src.join(&long).join(&long);
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("leaf.txt"), "leaf").unwrap();
        let dst = tmp.path().join("dst");

        let audit = MemoryAudit::new();
        let config = RecoverConfig {
            max_path_len: dst.as_os_str().len() + 200,
            ..RecoverConfig::default()
        };
        let engine = CopyEngine::new(
            config.clone(),
            CapacityGuard::new(Box::new(FixedSpace::megabytes(1024))),
            Arc::new(audit),
        )
        .unwrap();

        let report = engine.recover_folder(&src, &dst).unwrap();
        assert_eq!(report.outcomes.len(), 1);
        let outcome = &report.outcomes[0];
        assert!(outcome.is_success(), "{:?}", outcome.error_detail);
        assert!(outcome.destination.as_os_str().len() <= config.max_path_len);
        assert!(outcome.destination.starts_with(dst.join("src")));
        assert_eq!(outcome.destination.file_name().unwrap(), "leaf.txt");
        assert_eq!(fs::read_to_string(&outcome.destination).unwrap(), "leaf");
    }

    #[test]
    fn rerun_stays_within_the_path_bound() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let deep = src.join("n".repeat(60));
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("leaf.txt"), "leaf").unwrap();
        let dst = tmp.path().join("dst");

        let config = RecoverConfig {
            max_path_len: dst.as_os_str().len() + 43,
            ..RecoverConfig::default()
        };
        let engine = CopyEngine::new(
            config.clone(),
            CapacityGuard::new(Box::new(FixedSpace::megabytes(1024))),
            Arc::new(MemoryAudit::new()),
        )
        .unwrap();

        let first = engine.recover_folder(&src, &dst).unwrap();
        let second = engine.recover_folder(&src, &dst).unwrap();
        for report in [&first, &second] {
            let outcome = &report.outcomes[0];
            assert!(outcome.is_success(), "{:?}", outcome.error_detail);
            assert!(
                outcome.destination.as_os_str().len() <= config.max_path_len,
                "{}",
                outcome.destination.display()
            );
        }
        assert_ne!(first.outcomes[0].destination, second.outcomes[0].destination);
        assert_eq!(
            fs::read_to_string(&first.outcomes[0].destination).unwrap(),
            "leaf"
        );
    }

    #[test]
    fn blocked_destination_directory_fails_only_its_files() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("blocked")).unwrap();
        fs::create_dir_all(src.join("open")).unwrap();
        fs::write(src.join("blocked").join("x.txt"), "x").unwrap();
        fs::write(src.join("open").join("y.txt"), "y").unwrap();
        let dst = tmp.path().join("dst");
        fs::create_dir_all(dst.join("src")).unwrap();
        // a regular file where the directory should go
        fs::write(dst.join("src").join("blocked"), "occupied").unwrap();
        let (engine, audit) = engine_with_space(5 * 1024);

        let report = engine.recover_folder(&src, &dst).unwrap();
        assert_eq!(report.walk.dirs_failed, 1);
        assert_eq!(report.outcomes.len(), 2);
        let blocked = report
            .outcomes
            .iter()
            .find(|o| o.source.ends_with("blocked/x.txt"))
            .unwrap();
        assert_eq!(blocked.status, CopyStatus::Failed);
        assert!(blocked
            .error_detail
            .as_deref()
            .is_some_and(|d| d.starts_with("Failed to recover: ")));
        assert_eq!(fs::read_to_string(dst.join("src/open/y.txt")).unwrap(), "y");
        assert_eq!(
            fs::read_to_string(dst.join("src").join("blocked")).unwrap(),
            "occupied"
        );
        assert!(!report.is_clean());
        assert!(folder_log(&audit)
            .iter()
            .any(|m| m.starts_with("Failed to create directory: ")));
    }

    struct BrokenProbe;

    impl crate::capacity::SpaceProbe for BrokenProbe {
        fn available_bytes(&self, _path: &Path) -> std::io::Result<u64> {
            Err(std::io::Error::other("volume unavailable"))
        }
    }

    #[test]
    fn failed_space_query_refuses_the_run() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let dst = tmp.path().join("dst");
        let audit = MemoryAudit::new();
        let engine = CopyEngine::new(
            RecoverConfig::default(),
            CapacityGuard::new(Box::new(BrokenProbe)),
            Arc::new(audit.clone()),
        )
        .unwrap();

        let err = engine.recover_folder(&src, &dst).unwrap_err();
        assert!(matches!(
            err,
            RecoverError::InsufficientSpace {
                available_mb: None,
                ..
            }
        ));
        assert!(!dst.exists());
        let errors = audit
            .sink(&recovery_log_name(FOLDER_LABEL))
            .unwrap()
            .errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unknown"));
    }

    #[test]
    fn extension_recovery_sorts_into_per_extension_folders() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("trip").join("day1")).unwrap();
        fs::write(src.join("cover.jpg"), "c").unwrap();
        fs::write(src.join("trip").join("day1").join("beach.jpg"), "b").unwrap();
        fs::write(src.join("trip").join("notes.txt"), "n").unwrap();
        fs::write(src.join("trip").join("map.png"), "m").unwrap();
        let dst = tmp.path().join("dst");
        let (engine, audit) = engine_with_space(6000);

        let extensions = vec![".jpg".to_string(), ".png".to_string(), ".jpg".to_string()];
        let results = engine.recover_by_extension(&src, &dst, &extensions).unwrap();
        assert_eq!(results.len(), 2);

        let jpg = &results[0];
        assert_eq!(jpg.extension, ".jpg");
        assert_eq!(jpg.report.files_recovered(), 2);
        assert!(jpg.folder.join("cover.jpg").is_file());
        assert!(jpg.folder.join("trip/day1/beach.jpg").is_file());
        assert_eq!(jpg.folder, dst.join("Recovered .JPG Files"));

        let png = &results[1];
        assert_eq!(png.report.files_recovered(), 1);
        assert!(png.folder.join("trip/map.png").is_file());
        // only directories holding a matching file are created
        assert!(!png.folder.join("trip/day1").exists());
        assert!(!dst.join("Recovered .JPG Files/trip/notes.txt").exists());

        let jpg_log = audit.sink(&recovery_log_name(".jpg")).unwrap().messages();
        assert!(jpg_log.contains(
            &"Recovery process completed for .JPG files. Total files recovered: 2".to_string()
        ));
        assert!(audit.sink(&recovery_log_name(".png")).is_some());
    }

    #[test]
    fn extension_recovery_uses_the_bulk_floor() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let dst = tmp.path().join("dst");
        let (engine, audit) = engine_with_space(4999);

        let err = engine
            .recover_by_extension(&src, &dst, &[".txt".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            RecoverError::InsufficientSpace {
                required_mb: 5000,
                ..
            }
        ));
        assert!(!dst.exists());
        assert_eq!(
            audit.sink(&recovery_log_name(".txt")).unwrap().errors().len(),
            1
        );
    }

    #[test]
    fn map_folder_lists_relative_entries_into_a_fresh_log() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        let (engine, audit) = engine_with_space(1);

        engine.map_folder(&src).unwrap();
        let report = engine.map_folder(&src).unwrap();
        assert_eq!(report.directories, 1);
        assert_eq!(report.files, 2);
        assert_eq!(report.log_file, "folder_map_src_log.txt");

        let log = audit.sink("folder_map_src_log.txt").unwrap().messages();
        assert_eq!(log.len(), 5);
        assert!(log.contains(&"Directory: sub".to_string()));
        assert!(log.contains(&format!("File: {}", Path::new("sub").join("b.txt").display())));
        assert_eq!(log.last().unwrap(), "Directory scan completed.");
    }

    #[test]
    fn folder_name_resolves_dot_paths() {
        let tmp = tempdir().unwrap();
        let src = setup(tmp.path());
        assert_eq!(folder_name(&src), PathBuf::from("src"));
        assert_eq!(folder_name(&src.join("sub").join("..")), PathBuf::from("src"));
    }

    #[test]
    fn canonical_prefix_keeps_missing_tail() {
        let tmp = tempdir().unwrap();
        let base = fs::canonicalize(tmp.path()).unwrap();
        assert_eq!(
            canonical_prefix(&tmp.path().join("a").join("b")),
            base.join("a").join("b")
        );
    }
}
