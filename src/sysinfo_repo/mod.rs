// Host identity and process enumeration via sysinfo

mod linux;

use crate::models::{ProcessInfo, SystemInfo};
use std::sync::Arc;
use sysinfo::{CpuRefreshKind, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::instrument;

pub struct SysinfoRepo {
    sys: Arc<std::sync::Mutex<System>>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_list(CpuRefreshKind::nothing());
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
        }
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "get_system_info"))]
    pub async fn get_system_info(&self) -> anyhow::Result<SystemInfo> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let kernel = System::kernel_version()
                .or_else(linux::read_kernel_release_linux)
                .unwrap_or_else(|| "unknown".into());
            let os_name = linux::read_os_name_linux()
                .or_else(System::long_os_version)
                .unwrap_or_else(|| std::env::consts::OS.into());
            Ok(SystemInfo {
                platform: std::env::consts::OS.into(),
                kernel,
                os_name,
                cpu_count: sys.cpus().len().max(1),
                memory_total: sys.total_memory(),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    /// Live processes sorted by pid, at most `limit`.
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "list_processes"))]
    pub async fn list_processes(&self, limit: usize) -> anyhow::Result<Vec<ProcessInfo>> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing().with_memory(),
            );
            let mut processes: Vec<ProcessInfo> = sys
                .processes()
                .values()
                // Threads are listed alongside processes on Linux; keep only group leaders.
                .filter(|p| p.thread_kind().is_none())
                .map(|p| ProcessInfo {
                    pid: p.pid().as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                    rss_bytes: p.memory(),
                })
                .collect();
            processes.sort_by_key(|p| p.pid);
            processes.truncate(limit);
            tracing::debug!(count = processes.len(), "processes listed");
            Ok(processes)
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}
