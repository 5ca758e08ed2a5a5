// Process grouping by cgroup path and namespace inode

pub mod cgroup;

use crate::config::IsolationConfig;
use crate::counters::KernelSources;
use crate::models::{CgroupAggregate, IsolationContext, NamespaceSummary, ProcessInfo, now_millis};
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

pub const NAMESPACE_KINDS: [&str; 6] = ["mnt", "pid", "net", "ipc", "uts", "user"];

const MAX_SAMPLE_PROCESSES: usize = 4;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// What one successfully read process contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessMembership {
    pub name: String,
    pub rss_bytes: u64,
    pub cgroup: String,
    /// (kind, inode) for each namespace link that could be read.
    pub namespaces: Vec<(&'static str, String)>,
}

/// Inode from a namespace link target such as `net:[4026531840]`.
pub fn parse_ns_inode(target: &str) -> Option<String> {
    let (_, rest) = target.split_once(":[")?;
    let inode = rest.strip_suffix(']')?;
    (!inode.is_empty() && inode.bytes().all(|b| b.is_ascii_digit())).then(|| inode.to_string())
}

/// Reads cgroup membership and namespace links for one process.
/// `None` when the process is gone or its cgroup file is unreadable.
pub fn read_membership(sources: &KernelSources, process: &ProcessInfo) -> Option<ProcessMembership> {
    let dir = sources.proc_root.join(process.pid.to_string());
    let content = std::fs::read_to_string(dir.join("cgroup")).ok()?;
    let namespaces = NAMESPACE_KINDS
        .iter()
        .filter_map(|&kind| {
            let target = std::fs::read_link(dir.join("ns").join(kind)).ok()?;
            Some((kind, parse_ns_inode(target.to_str()?)?))
        })
        .collect();
    Some(ProcessMembership {
        name: process.name.clone(),
        rss_bytes: process.rss_bytes,
        cgroup: cgroup::parse_membership(&content),
        namespaces,
    })
}

/// Group by cgroup path, sorted by (process_count, memory) descending then path.
pub fn aggregate_cgroups(members: &[ProcessMembership]) -> Vec<CgroupAggregate> {
    let mut by_path: HashMap<&str, CgroupAggregate> = HashMap::new();
    for m in members {
        let agg = by_path
            .entry(m.cgroup.as_str())
            .or_insert_with(|| CgroupAggregate {
                path: m.cgroup.clone(),
                ..Default::default()
            });
        agg.process_count += 1;
        agg.memory_mb_sum += m.rss_bytes as f64 / BYTES_PER_MB;
        if agg.sample_processes.len() < MAX_SAMPLE_PROCESSES && !agg.sample_processes.contains(&m.name) {
            agg.sample_processes.push(m.name.clone());
        }
    }
    let mut out: Vec<CgroupAggregate> = by_path.into_values().collect();
    out.sort_by(|a, b| {
        b.process_count
            .cmp(&a.process_count)
            .then_with(|| b.memory_mb_sum.total_cmp(&a.memory_mb_sum))
            .then_with(|| a.path.cmp(&b.path))
    });
    out
}

/// One summary per namespace kind, in fixed order. Ties go to the smaller inode.
pub fn summarize_namespaces(members: &[ProcessMembership]) -> Vec<NamespaceSummary> {
    let scanned = members.len();
    NAMESPACE_KINDS
        .iter()
        .map(|&kind| {
            let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
            for (_, inode) in members
                .iter()
                .flat_map(|m| m.namespaces.iter())
                .filter(|(k, _)| *k == kind)
            {
                *tally.entry(inode.as_str()).or_insert(0) += 1;
            }
            let dominant = tally.iter().fold(None::<(&str, usize)>, |best, (&inode, &count)| {
                match best {
                    Some((_, c)) if c >= count => best,
                    _ => Some((inode, count)),
                }
            });
            let dominant_count = dominant.map_or(0, |(_, c)| c);
            NamespaceSummary {
                id: kind.to_string(),
                label: kind.to_uppercase(),
                unique_count: tally.len(),
                dominant_inode: dominant.map(|(inode, _)| inode.to_string()),
                dominant_count,
                activity: if scanned > 0 {
                    dominant_count as f64 / scanned as f64
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Builds isolation contexts for a list of live processes.
#[derive(Debug, Clone)]
pub struct IsolationAggregator {
    sources: KernelSources,
    config: IsolationConfig,
}

impl IsolationAggregator {
    pub fn new(sources: KernelSources, config: IsolationConfig) -> Self {
        Self { sources, config }
    }

    pub fn max_processes(&self) -> usize {
        self.config.max_processes
    }

    /// Blocking scan. Processes that vanish or deny access are skipped and not counted.
    pub fn scan(&self, processes: &[ProcessInfo]) -> IsolationContext {
        let members: Vec<ProcessMembership> = processes
            .iter()
            .take(self.config.max_processes)
            .filter_map(|p| read_membership(&self.sources, p))
            .collect();
        let mut top_cgroups = aggregate_cgroups(&members);
        top_cgroups.truncate(self.config.top_cgroups);
        match cgroup::unified_root(&self.sources) {
            Some(root) => top_cgroups.iter_mut().for_each(|agg| cgroup::enrich(&root, agg)),
            None => tracing::debug!("cgroup v2 hierarchy not mounted, resource fields stay null"),
        }
        IsolationContext {
            timestamp: now_millis(),
            processes_scanned: members.len(),
            namespaces: summarize_namespaces(&members),
            top_cgroups,
        }
    }

    #[instrument(skip(self, processes), fields(aggregator = "isolation", processes = processes.len()))]
    pub async fn context(&self, processes: Vec<ProcessInfo>) -> anyhow::Result<IsolationContext> {
        let this = self.clone();
        let ctx = tokio::task::spawn_blocking(move || this.scan(&processes))
            .await
            .map_err(|e| anyhow::anyhow!("isolation scan task join: {}", e))?;
        tracing::debug!(
            scanned = ctx.processes_scanned,
            cgroups = ctx.top_cgroups.len(),
            "isolation context built"
        );
        Ok(ctx)
    }
}
