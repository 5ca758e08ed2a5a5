// Cgroup / namespace grouping models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceSummary {
    /// Namespace kind: mnt, pid, net, ipc, uts, user.
    pub id: String,
    pub label: String,
    pub unique_count: usize,
    pub dominant_inode: Option<String>,
    pub dominant_count: usize,
    /// dominant_count / processes scanned.
    pub activity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CgroupAggregate {
    pub path: String,
    pub process_count: usize,
    pub memory_mb_sum: f64,
    pub sample_processes: Vec<String>,
    pub cpu_quota_cores: Option<f64>,
    pub memory_current_mb: Option<f64>,
    pub memory_max_mb: Option<f64>,
    pub pids_current: Option<u64>,
    pub pids_max: Option<u64>,
    pub io_total_mb: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationContext {
    pub timestamp: u64,
    pub processes_scanned: usize,
    pub namespaces: Vec<NamespaceSummary>,
    pub top_cgroups: Vec<CgroupAggregate>,
}
