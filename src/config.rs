use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub network_stack: NetworkStackConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
    #[serde(default)]
    pub isolation: IsolationConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Where kernel-exposed files are read from. Tests point these at fixture trees.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
    /// Hard limit for one `ss` invocation.
    pub ss_timeout_ms: u64,
    /// Searched after PATH when resolving `ss`.
    pub ss_search_dirs: Vec<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
            ss_timeout_ms: 2000,
            ss_search_dirs: ["/usr/sbin", "/sbin", "/usr/bin", "/bin"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        }
    }
}

/// Divisors that map raw rates onto [0, 1] layer activity.
///
/// These are presentation parameters picked so the visualization stays legible on a
/// typical workstation. They carry no physical meaning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkStackConfig {
    pub userspace_processes: f64,
    pub socket_sockets: f64,
    pub tcp_segments_per_sec: f64,
    pub ip_packets_per_sec: f64,
    pub netfilter_drops_per_sec: f64,
    pub retrans_per_sec: f64,
    pub driver_bytes_per_sec: f64,
    pub nic_packets_per_sec: f64,
    pub nic_errors_per_sec: f64,
}

impl Default for NetworkStackConfig {
    fn default() -> Self {
        Self {
            userspace_processes: 400.0,
            socket_sockets: 2000.0,
            tcp_segments_per_sec: 15000.0,
            ip_packets_per_sec: 15000.0,
            netfilter_drops_per_sec: 120.0,
            retrans_per_sec: 40.0,
            driver_bytes_per_sec: 12_500_000.0,
            nic_packets_per_sec: 15000.0,
            nic_errors_per_sec: 40.0,
        }
    }
}

impl NetworkStackConfig {
    fn scales(&self) -> [(&'static str, f64); 9] {
        [
            ("userspace_processes", self.userspace_processes),
            ("socket_sockets", self.socket_sockets),
            ("tcp_segments_per_sec", self.tcp_segments_per_sec),
            ("ip_packets_per_sec", self.ip_packets_per_sec),
            ("netfilter_drops_per_sec", self.netfilter_drops_per_sec),
            ("retrans_per_sec", self.retrans_per_sec),
            ("driver_bytes_per_sec", self.driver_bytes_per_sec),
            ("nic_packets_per_sec", self.nic_packets_per_sec),
            ("nic_errors_per_sec", self.nic_errors_per_sec),
        ]
    }
}

/// Upper bound for `devices.class_scan_limit`.
pub const MAX_CLASS_SCAN: usize = 4;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Devices kept after sorting by load.
    pub display_limit: usize,
    /// Max entries taken from each of the misc/input/gpu/usb class directories.
    pub class_scan_limit: usize,
    /// Converts interrupt rate into a byte-rate so interrupt-only devices rank
    /// against throughput-bearing ones. Presentation parameter.
    pub synthetic_bytes_per_irq: f64,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            display_limit: 20,
            class_scan_limit: 4,
            synthetic_bytes_per_irq: 4096.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    pub max_processes: usize,
    /// Cgroups enriched with cgroup-v2 resource values.
    pub top_cgroups: usize,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            max_processes: 600,
            top_cgroups: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishingConfig {
    /// Frame interval for /ws/network-stack and /ws/devices.
    pub stream_interval_ms: u64,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            stream_interval_ms: 1500,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.sources.proc_root.as_os_str().is_empty(),
            "sources.proc_root must be non-empty"
        );
        anyhow::ensure!(
            !self.sources.sys_root.as_os_str().is_empty(),
            "sources.sys_root must be non-empty"
        );
        anyhow::ensure!(
            self.sources.ss_timeout_ms > 0,
            "sources.ss_timeout_ms must be > 0, got {}",
            self.sources.ss_timeout_ms
        );
        for (name, value) in self.network_stack.scales() {
            anyhow::ensure!(
                value.is_finite() && value > 0.0,
                "network_stack.{} must be > 0, got {}",
                name,
                value
            );
        }
        anyhow::ensure!(
            self.devices.display_limit > 0,
            "devices.display_limit must be > 0, got {}",
            self.devices.display_limit
        );
        anyhow::ensure!(
            (1..=MAX_CLASS_SCAN).contains(&self.devices.class_scan_limit),
            "devices.class_scan_limit must be between 1 and {}, got {}",
            MAX_CLASS_SCAN,
            self.devices.class_scan_limit
        );
        anyhow::ensure!(
            self.devices.synthetic_bytes_per_irq.is_finite()
                && self.devices.synthetic_bytes_per_irq > 0.0,
            "devices.synthetic_bytes_per_irq must be > 0, got {}",
            self.devices.synthetic_bytes_per_irq
        );
        anyhow::ensure!(
            self.isolation.max_processes > 0,
            "isolation.max_processes must be > 0, got {}",
            self.isolation.max_processes
        );
        anyhow::ensure!(
            self.isolation.top_cgroups > 0,
            "isolation.top_cgroups must be > 0, got {}",
            self.isolation.top_cgroups
        );
        anyhow::ensure!(
            self.publishing.stream_interval_ms > 0,
            "publishing.stream_interval_ms must be > 0, got {}",
            self.publishing.stream_interval_ms
        );
        Ok(())
    }
}
