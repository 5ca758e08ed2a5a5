// cgroup membership parsing and cgroup-v2 resource-control reads

use crate::counters::{KernelSources, read_attr};
use crate::models::CgroupAggregate;
use std::path::{Component, Path, PathBuf};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Cgroup path from a `/proc/<pid>/cgroup` body.
///
/// The unified `0::` line wins; otherwise the last non-root controller path; otherwise `/`.
pub fn parse_membership(content: &str) -> String {
    let mut fallback = None;
    for line in content.lines() {
        let mut parts = line.splitn(3, ':');
        let (Some(id), Some(controllers), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        if id == "0" && controllers.is_empty() {
            return path.to_string();
        }
        if path != "/" && !path.is_empty() {
            fallback = Some(path);
        }
    }
    fallback.unwrap_or("/").to_string()
}

/// `max` (unlimited) maps to `None`, as does anything unparsable.
fn limit_value(raw: &str) -> Option<u64> {
    match raw.trim() {
        "max" => None,
        v => v.parse().ok(),
    }
}

/// `cpu.max` is `<quota> <period>`; a `max` quota means no limit.
pub fn parse_cpu_max(raw: &str) -> Option<f64> {
    let mut it = raw.split_whitespace();
    let quota: f64 = it.next()?.parse().ok()?;
    let period: f64 = it.next().unwrap_or("100000").parse().ok()?;
    (period > 0.0).then(|| quota / period)
}

/// Sum of `rbytes` and `wbytes` across every device line of `io.stat`.
pub fn parse_io_stat_bytes(raw: &str) -> u64 {
    raw.split_whitespace()
        .filter_map(|kv| kv.split_once('='))
        .filter(|(k, _)| *k == "rbytes" || *k == "wbytes")
        .filter_map(|(_, v)| v.parse::<u64>().ok())
        .fold(0u64, |acc, v| acc.saturating_add(v))
}

/// Unified hierarchy mount, when one is present.
pub fn unified_root(sources: &KernelSources) -> Option<PathBuf> {
    let root = sources.sys_path("fs/cgroup");
    root.join("cgroup.controllers").exists().then_some(root)
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Fill the resource-control fields of `agg` from its directory under `root`.
/// Missing files leave the field `None`. Paths escaping `root` (a process in another
/// cgroup namespace reports `/../..`) are not read.
pub fn enrich(root: &Path, agg: &mut CgroupAggregate) {
    let rel = Path::new(agg.path.trim_start_matches('/'));
    if rel.components().any(|c| c == Component::ParentDir) {
        tracing::debug!(path = %agg.path, "cgroup path escapes hierarchy, skipping enrichment");
        return;
    }
    let dir = root.join(rel);
    let attr = |name: &str| read_attr(&dir.join(name));
    agg.cpu_quota_cores = attr("cpu.max").and_then(|v| parse_cpu_max(&v));
    agg.memory_current_mb = attr("memory.current").and_then(|v| limit_value(&v)).map(mb);
    agg.memory_max_mb = attr("memory.max").and_then(|v| limit_value(&v)).map(mb);
    agg.pids_current = attr("pids.current").and_then(|v| limit_value(&v));
    agg.pids_max = attr("pids.max").and_then(|v| limit_value(&v));
    agg.io_total_mb = std::fs::read_to_string(dir.join("io.stat"))
        .ok()
        .map(|v| mb(parse_io_stat_bytes(&v)));
}
