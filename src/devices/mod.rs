// Device topology: sysfs enumeration + per-device throughput and interrupt rates

pub mod correlate;
pub mod enumerate;

use crate::config::DevicesConfig;
use crate::counters::KernelSources;
use crate::counters::disk::{self, SECTOR_BYTES};
use crate::counters::interrupts::{self, InterruptLine};
use crate::counters::net;
use crate::error::degrade;
use crate::models::{Device, DeviceCategory, DevicesMeta, DevicesSnapshot, now_millis};
use crate::rate::RateTracker;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::instrument;

/// Largest `?limit=` accepted by the devices endpoint.
pub const MAX_DISPLAY_LIMIT: usize = 64;

const LAYOUT: &str = "belt";

/// One blocking read of everything the builder needs.
#[derive(Debug, Clone)]
pub struct DeviceInputs {
    pub devices: Vec<Device>,
    /// Sectors read + written, by disk name.
    pub disk_sectors: HashMap<String, u64>,
    /// rx + tx bytes, by interface name.
    pub net_bytes: HashMap<String, u64>,
    /// `None` when /proc/interrupts could not be read.
    pub interrupts: Option<Vec<InterruptLine>>,
    pub at: Instant,
}

pub fn collect_inputs(sources: &KernelSources, class_scan_limit: usize) -> DeviceInputs {
    let devices = enumerate::enumerate(sources, class_scan_limit);
    let disk_sectors = degrade(disk::read_diskstats(sources), "diskstats")
        .into_iter()
        .map(|d| {
            let total = d.sectors_total();
            (d.name, total)
        })
        .collect();
    let net_bytes = degrade(net::read_net_dev(sources), "net_dev")
        .into_iter()
        .map(|i| (i.name, i.rx_bytes.saturating_add(i.tx_bytes)))
        .collect();
    let interrupts = match interrupts::read_interrupts(sources) {
        Ok(lines) => Some(lines),
        Err(e) => {
            tracing::debug!(source = "interrupts", error = %e, "source unavailable, irq rates stay 0");
            None
        }
    };
    DeviceInputs {
        devices,
        disk_sectors,
        net_bytes,
        interrupts,
        at: Instant::now(),
    }
}

fn effective_bps(d: &Device, bytes_per_irq: f64) -> f64 {
    d.throughput_bps.max(d.irq_per_sec * bytes_per_irq)
}

/// Sets `load_norm`, sorts by (load_norm, throughput, irq) descending and truncates.
/// Returns the largest effective byte-rate of the poll.
pub fn rank(devices: &mut Vec<Device>, bytes_per_irq: f64, limit: usize) -> f64 {
    let max_bps = devices
        .iter()
        .map(|d| effective_bps(d, bytes_per_irq))
        .fold(0.0_f64, f64::max);
    for d in devices.iter_mut() {
        d.load_norm = if max_bps > 0.0 {
            (effective_bps(d, bytes_per_irq) / max_bps).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
    devices.sort_by(|a, b| {
        b.load_norm
            .total_cmp(&a.load_norm)
            .then_with(|| b.throughput_bps.total_cmp(&a.throughput_bps))
            .then_with(|| b.irq_per_sec.total_cmp(&a.irq_per_sec))
    });
    devices.truncate(limit);
    max_bps
}

fn meta(devices: &[Device], max_throughput_bps: f64) -> DevicesMeta {
    let mut bus_counts = BTreeMap::new();
    let mut category_counts = BTreeMap::new();
    for d in devices {
        *bus_counts.entry(d.bus.as_str().to_string()).or_insert(0) += 1;
        *category_counts
            .entry(d.category.as_str().to_string())
            .or_insert(0) += 1;
    }
    DevicesMeta {
        count: devices.len(),
        max_throughput_bps,
        bus_counts,
        category_counts,
    }
}

/// Feed counters through the tracker and rank. Pure apart from the tracker baselines.
pub fn build_snapshot(
    inputs: DeviceInputs,
    rates: &RateTracker,
    config: &DevicesConfig,
    limit: usize,
) -> DevicesSnapshot {
    let DeviceInputs {
        mut devices,
        disk_sectors,
        net_bytes,
        interrupts,
        at,
    } = inputs;
    for d in devices.iter_mut() {
        d.throughput_bps = match d.category {
            DeviceCategory::Block => disk_sectors.get(&d.name).map_or(0.0, |&sectors| {
                rates.rate_at(&format!("disk_sectors:{}", d.name), sectors, at) * SECTOR_BYTES as f64
            }),
            DeviceCategory::Net => net_bytes.get(&d.name).map_or(0.0, |&bytes| {
                rates.rate_at(&format!("net_bytes:{}", d.name), bytes, at)
            }),
            _ => 0.0,
        };
        if let Some(lines) = &interrupts {
            let total = correlate::correlate(&d.irq_tokens, lines);
            d.irq_per_sec = rates.rate_at(&format!("{}::{}", d.category.as_str(), d.name), total, at);
        }
    }
    let max_bps = rank(&mut devices, config.synthetic_bytes_per_irq, limit);
    DevicesSnapshot {
        timestamp: now_millis(),
        layout: LAYOUT.to_string(),
        meta: meta(&devices, max_bps),
        devices,
    }
}

/// Produces device snapshots against the configured kernel sources.
pub struct DeviceTopologyBuilder {
    sources: KernelSources,
    config: DevicesConfig,
}

impl DeviceTopologyBuilder {
    pub fn new(sources: KernelSources, config: DevicesConfig) -> Self {
        Self { sources, config }
    }

    pub fn default_limit(&self) -> usize {
        self.config.display_limit
    }

    #[instrument(skip(self, rates), fields(aggregator = "devices"))]
    pub async fn snapshot(&self, rates: &RateTracker, limit: usize) -> anyhow::Result<DevicesSnapshot> {
        let sources = self.sources.clone();
        let scan_limit = self.config.class_scan_limit;
        let inputs = tokio::task::spawn_blocking(move || collect_inputs(&sources, scan_limit))
            .await
            .map_err(|e| anyhow::anyhow!("device scan task join: {}", e))?;
        tracing::debug!(enumerated = inputs.devices.len(), "devices enumerated");
        Ok(build_snapshot(inputs, rates, &self.config, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bus;
    use std::time::Duration;

    fn device(category: DeviceCategory, name: &str, tokens: &[&str]) -> Device {
        Device {
            name: name.into(),
            category,
            display_type: category.as_str().into(),
            bus: Bus::Virtual,
            driver: None,
            major: None,
            minor: None,
            irq_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            throughput_bps: 0.0,
            irq_per_sec: 0.0,
            load_norm: 0.0,
            targets: vec!["kernel".into()],
        }
    }

    fn inputs(at: Instant, sectors: u64, bytes: u64, irqs: Option<u64>) -> DeviceInputs {
        DeviceInputs {
            devices: vec![
                device(DeviceCategory::Block, "sda", &["sda"]),
                device(DeviceCategory::Net, "eth0", &["eth0"]),
                device(DeviceCategory::Char, "tty0", &["tty0", "serial"]),
            ],
            disk_sectors: HashMap::from([("sda".to_string(), sectors)]),
            net_bytes: HashMap::from([("eth0".to_string(), bytes)]),
            interrupts: irqs.map(|n| {
                vec![InterruptLine {
                    text: "4: 0 io-apic 4-edge serial".into(),
                    total: n,
                }]
            }),
            at,
        }
    }

    #[test]
    fn rates_and_load_norm_bounds() {
        let rates = RateTracker::new();
        let config = DevicesConfig::default();
        let t0 = Instant::now();
        build_snapshot(inputs(t0, 0, 0, Some(0)), &rates, &config, 20);
        let s = build_snapshot(
            inputs(t0 + Duration::from_secs(1), 2000, 5_000_000, Some(100)),
            &rates,
            &config,
            20,
        );
        let by_name = |n: &str| s.devices.iter().find(|d| d.name == n).unwrap();
        assert!((by_name("sda").throughput_bps - 1_024_000.0).abs() < 1e-6);
        assert!((by_name("eth0").throughput_bps - 5_000_000.0).abs() < 1e-6);
        assert!((by_name("tty0").irq_per_sec - 100.0).abs() < 1e-6);
        assert!(s.devices.iter().all(|d| (0.0..=1.0).contains(&d.load_norm)));
        assert_eq!(s.devices[0].name, "eth0");
        assert_eq!(s.devices[0].load_norm, 1.0);
        assert_eq!(s.meta.max_throughput_bps, 5_000_000.0);
        assert_eq!(s.meta.count, 3);
        assert_eq!(s.layout, "belt");
    }

    #[test]
    fn immediate_second_poll_is_zero() {
        let rates = RateTracker::new();
        let config = DevicesConfig::default();
        let t0 = Instant::now();
        build_snapshot(inputs(t0, 500, 500, Some(10)), &rates, &config, 20);
        let s = build_snapshot(inputs(t0, 500, 500, Some(10)), &rates, &config, 20);
        assert!(s.devices.iter().all(|d| d.throughput_bps == 0.0 && d.irq_per_sec == 0.0));
        assert!(s.devices.iter().all(|d| d.load_norm == 0.0));
    }

    #[test]
    fn missing_interrupts_keeps_irq_zero() {
        let rates = RateTracker::new();
        let config = DevicesConfig::default();
        let t0 = Instant::now();
        build_snapshot(inputs(t0, 0, 0, None), &rates, &config, 20);
        let s = build_snapshot(inputs(t0 + Duration::from_secs(1), 10, 10, None), &rates, &config, 20);
        assert_eq!(s.devices.len(), 3);
        assert!(s.devices.iter().all(|d| d.irq_per_sec == 0.0));
    }

    #[test]
    fn irq_only_device_ranks_with_synthetic_bytes() {
        let mut devices = vec![
            device(DeviceCategory::Block, "sda", &[]),
            device(DeviceCategory::Input, "event0", &[]),
        ];
        devices[0].throughput_bps = 1000.0;
        devices[1].irq_per_sec = 1.0;
        let max = rank(&mut devices, 4096.0, 20);
        assert_eq!(max, 4096.0);
        assert_eq!(devices[0].name, "event0");
        assert!((devices[1].load_norm - 1000.0 / 4096.0).abs() < 1e-9);
    }

    #[test]
    fn rank_truncates_and_counts_meta_over_kept() {
        let mut devices: Vec<Device> = (0..5)
            .map(|i| {
                let mut d = device(DeviceCategory::Misc, &format!("m{}", i), &[]);
                d.throughput_bps = i as f64;
                d
            })
            .collect();
        let max = rank(&mut devices, 4096.0, 2);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "m4");
        let m = meta(&devices, max);
        assert_eq!(m.count, 2);
        assert_eq!(m.category_counts.get("misc"), Some(&2));
        assert_eq!(m.bus_counts.get("virtual"), Some(&2));
    }
}
