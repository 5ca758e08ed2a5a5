// Host identity and process enumeration models

use serde::{Deserialize, Serialize};

/// Static host identity; fetched once at startup and reported by GET /health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub platform: String,
    pub kernel: String,
    pub os_name: String,
    pub cpu_count: usize,
    pub memory_total: u64,
}

/// One live process as seen by the process-introspection library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub rss_bytes: u64,
}
