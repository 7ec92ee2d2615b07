//! Free-space checks against the destination volume.
//!
//! The volume query itself sits behind [`SpaceProbe`]; [`SystemSpace`] picks
//! the platform primitive at compile time and the guard logic never looks at
//! which one is active.

use std::io;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Capability to report the free bytes available to the current user on the
/// volume holding `path`.
pub trait SpaceProbe: Send + Sync {
    fn available_bytes(&self, path: &Path) -> io::Result<u64>;
}

/// Platform free-space query (`statvfs` on unix, the mounted disk list on windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpace;

#[cfg(unix)]
impl SpaceProbe for SystemSpace {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
        let fragment_size = u64::from(stat.fragment_size());
        let blocks_available = u64::from(stat.blocks_available());
        Ok(fragment_size.saturating_mul(blocks_available))
    }
}

#[cfg(windows)]
impl SpaceProbe for SystemSpace {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        let resolved = std::path::absolute(path)?;
        let disks = sysinfo::Disks::new_with_refreshed_list();
        // the disk with the longest mount point containing the path holds it
        disks
            .list()
            .iter()
            .filter(|disk| resolved.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no volume found for {}", path.display()),
                )
            })
    }
}

#[cfg(not(any(unix, windows)))]
impl SpaceProbe for SystemSpace {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("free space query unsupported for {}", path.display()),
        ))
    }
}

/// Probe reporting a constant amount of free space regardless of path.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpace {
    pub bytes: u64,
}

impl FixedSpace {
    pub fn megabytes(mb: u64) -> Self {
        Self {
            bytes: mb.saturating_mul(BYTES_PER_MB),
        }
    }
}

impl SpaceProbe for FixedSpace {
    fn available_bytes(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.bytes)
    }
}

/// Space that must be free on the volume holding `target_directory`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityRequirement {
    pub target_directory: PathBuf,
    pub required_mb: NonZeroU64,
}

impl CapacityRequirement {
    pub fn new(target_directory: impl Into<PathBuf>, required_mb: NonZeroU64) -> Self {
        Self {
            target_directory: target_directory.into(),
            required_mb,
        }
    }
}

/// Result of evaluating one [`CapacityRequirement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceCheck {
    pub available_mb: u64,
    pub sufficient: bool,
}

pub struct CapacityGuard {
    probe: Box<dyn SpaceProbe>,
}

impl CapacityGuard {
    pub fn new(probe: Box<dyn SpaceProbe>) -> Self {
        Self { probe }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SystemSpace))
    }

    /// Free space in binary megabytes on the volume holding `directory`.
    ///
    /// `directory` need not exist yet; the nearest existing ancestor is queried.
    pub fn available_megabytes(&self, directory: &Path) -> io::Result<u64> {
        let volume_path = nearest_existing_ancestor(directory).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no existing ancestor for {}", directory.display()),
            )
        })?;
        Ok(self.probe.available_bytes(&volume_path)? / BYTES_PER_MB)
    }

    pub fn check(&self, requirement: &CapacityRequirement) -> io::Result<SpaceCheck> {
        let available_mb = self.available_megabytes(&requirement.target_directory)?;
        Ok(SpaceCheck {
            available_mb,
            sufficient: available_mb >= requirement.required_mb.get(),
        })
    }

    pub fn has_sufficient_space(
        &self,
        directory: &Path,
        required_mb: NonZeroU64,
    ) -> io::Result<bool> {
        let requirement = CapacityRequirement::new(directory, required_mb);
        Ok(self.check(&requirement)?.sufficient)
    }
}

impl std::fmt::Debug for CapacityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityGuard").finish_non_exhaustive()
    }
}

fn nearest_existing_ancestor(directory: &Path) -> Option<PathBuf> {
    for ancestor in directory.ancestors() {
        if ancestor.as_os_str().is_empty() {
            return Some(PathBuf::from("."));
        }
        if ancestor.exists() {
            return Some(ancestor.to_path_buf());
        }
    }
    None
}
