// Raw counter reads from /proc and /sys. Stateless; every reader is one best-effort attempt.

pub mod disk;
pub mod interrupts;
pub mod net;
pub mod sockets;

use crate::config::SourcesConfig;
use crate::error::SourceUnavailable;
use std::path::{Path, PathBuf};

/// Roots of the kernel-exposed filesystems.
#[derive(Debug, Clone)]
pub struct KernelSources {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl Default for KernelSources {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}

impl From<&SourcesConfig> for KernelSources {
    fn from(c: &SourcesConfig) -> Self {
        Self {
            proc_root: c.proc_root.clone(),
            sys_root: c.sys_root.clone(),
        }
    }
}

impl KernelSources {
    pub fn new(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    pub fn proc_path(&self, rel: &str) -> PathBuf {
        self.proc_root.join(rel)
    }

    pub fn sys_path(&self, rel: &str) -> PathBuf {
        self.sys_root.join(rel)
    }

    /// Number of numeric (pid) entries under the proc root.
    pub fn count_processes(&self) -> Result<u64, SourceUnavailable> {
        let entries = std::fs::read_dir(&self.proc_root)
            .map_err(|e| SourceUnavailable::io(&self.proc_root, e))?;
        Ok(entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            })
            .count() as u64)
    }
}

pub(crate) fn read_source(path: &Path) -> Result<String, SourceUnavailable> {
    std::fs::read_to_string(path).map_err(|e| SourceUnavailable::io(path, e))
}

/// Trimmed single-value sysfs attribute; `None` when absent or empty.
pub(crate) fn read_attr(path: &Path) -> Option<String> {
    let v = std::fs::read_to_string(path).ok()?;
    let v = v.trim();
    if v.is_empty() {
        return None;
    }
    Some(v.to_string())
}

/// Sorted entry names of a directory, empty when it cannot be listed.
pub(crate) fn list_dir(path: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(path) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}
