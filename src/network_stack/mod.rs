// Seven-layer network stack activity model (userspace -> socket -> tcp -> ip -> netfilter -> driver -> nic)

pub mod ss;

use crate::config::NetworkStackConfig;
use crate::counters::KernelSources;
use crate::counters::net::{self, InterfaceCounters, ProtocolCounters};
use crate::counters::sockets::{self, SockStat};
use crate::error::degrade;
use crate::models::*;
use crate::rate::{CounterSnapshot, RateTracker, rate_of};
use ss::{SocketMetrics, SsProbe};
use std::time::Instant;
use tracing::instrument;

const LAYERS: [(&str, &str); 7] = [
    ("userspace", "Userspace"),
    ("socket", "Socket API"),
    ("tcp", "TCP/UDP"),
    ("ip", "IP"),
    ("netfilter", "Netfilter"),
    ("driver", "Driver"),
    ("nic", "NIC"),
];

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Everything read from the kernel for one frame. `None` marks an unavailable source,
/// whose rate keys are then not fed to the tracker at all.
#[derive(Debug, Clone, Default)]
pub struct StackCounters {
    pub active_processes: u64,
    pub sockstat: SockStat,
    pub snmp: Option<ProtocolCounters>,
    /// Default interface, known even when its counters are not.
    pub iface_name: Option<String>,
    /// `None` when /proc/net/dev did not list the default interface.
    pub iface: Option<InterfaceCounters>,
    pub iface_speed_mbps: Option<u64>,
    pub connections: Vec<Connection>,
}

/// Blocking read of every counter source. Never fails; unavailable sources degrade.
pub fn collect_counters(sources: &KernelSources) -> StackCounters {
    let ifaces = degrade(net::read_net_dev(sources), "net_dev");
    let iface_name = net::default_iface(sources, &ifaces);
    let iface = iface_name
        .as_deref()
        .and_then(|name| ifaces.iter().find(|i| i.name == name).cloned());
    let snmp = match net::read_snmp(sources) {
        Ok(mut snmp) => {
            snmp.merge(degrade(net::read_netstat(sources), "netstat"));
            Some(snmp)
        }
        Err(e) => {
            tracing::debug!(source = "snmp", error = %e, "source unavailable, using default");
            None
        }
    };
    StackCounters {
        active_processes: degrade(sources.count_processes(), "proc_pids"),
        sockstat: degrade(sockets::read_sockstat(sources), "sockstat"),
        snmp,
        iface_speed_mbps: iface_name
            .as_deref()
            .and_then(|name| net::interface_speed_mbps(sources, name)),
        iface_name,
        iface,
        connections: degrade(net::read_connections(sources), "connections"),
    }
}

/// First connection with a routable remote peer, else the first connection, else none.
pub fn select_flow(connections: &[Connection]) -> Option<&Connection> {
    connections
        .iter()
        .find(|c| {
            c.remote_ip
                .is_some_and(|ip| !ip.is_loopback() && !ip.is_unspecified())
        })
        .or_else(|| connections.first())
}

fn norm(raw: f64, scale: f64) -> f64 {
    if !raw.is_finite() || scale <= 0.0 {
        return 0.0;
    }
    (raw / scale).clamp(0.0, 1.0)
}

const SNMP_RATE_KEYS: [(&str, &str); 7] = [
    ("ip_in", "Ip.InReceives"),
    ("ip_out", "Ip.OutRequests"),
    ("tcp_in_segs", "Tcp.InSegs"),
    ("tcp_out_segs", "Tcp.OutSegs"),
    ("tcp_retrans", "Tcp.RetransSegs"),
    ("udp_in", "Udp.InDatagrams"),
    ("udp_out", "Udp.OutDatagrams"),
];

const IP_DROP_KEYS: [&str; 4] = ["Ip.InDiscards", "Ip.OutDiscards", "Ip.InHdrErrors", "Ip.InAddrErrors"];

/// Only counters actually read become baselines; a missing one must not seed a zero.
fn counter_snapshot(counters: &StackCounters, at: Instant) -> CounterSnapshot {
    let mut snap = CounterSnapshot::new(at);
    if let Some(snmp) = &counters.snmp {
        for (rate_key, counter) in SNMP_RATE_KEYS {
            if snmp.contains(counter) {
                snap.insert(rate_key, snmp.get(counter));
            }
        }
        if IP_DROP_KEYS.iter().any(|key| snmp.contains(key)) {
            let drops = IP_DROP_KEYS
                .iter()
                .fold(0u64, |acc, key| acc.saturating_add(snmp.get(key)));
            snap.insert("ip_drops", drops);
        }
    }
    if let Some(i) = counters.iface.as_ref().filter(|i| !i.name.is_empty()) {
        snap.insert(format!("iface_rx:{}", i.name), i.rx_bytes)
            .insert(format!("iface_tx:{}", i.name), i.tx_bytes)
            .insert(format!("iface_rx_pkts:{}", i.name), i.rx_packets)
            .insert(format!("iface_tx_pkts:{}", i.name), i.tx_packets)
            .insert(
                format!("iface_errs:{}", i.name),
                i.rx_errors.saturating_add(i.tx_errors),
            );
    }
    snap
}

/// Derive one frame from counters read at `at`, updating the rate baselines.
pub fn build_frame(
    counters: &StackCounters,
    socket_metrics: &SocketMetrics,
    rates: &RateTracker,
    at: Instant,
    scales: &NetworkStackConfig,
) -> NetworkStackFrame {
    let samples = rates.observe(&counter_snapshot(counters, at));
    let iface_name = counters.iface_name.clone();
    let iface_rate = |family: &str| match &iface_name {
        Some(name) => rate_of(&samples, &format!("{}:{}", family, name)),
        None => 0.0,
    };

    let ip_in = rate_of(&samples, "ip_in");
    let ip_out = rate_of(&samples, "ip_out");
    let drop_per_sec = rate_of(&samples, "ip_drops");
    let in_segs = rate_of(&samples, "tcp_in_segs");
    let out_segs = rate_of(&samples, "tcp_out_segs");
    let retrans = rate_of(&samples, "tcp_retrans");
    let rx_bps = iface_rate("iface_rx");
    let tx_bps = iface_rate("iface_tx");
    let rx_pps = iface_rate("iface_rx_pkts");
    let tx_pps = iface_rate("iface_tx_pkts");
    let errs_per_sec = iface_rate("iface_errs");
    let snmp = counters.snmp.clone().unwrap_or_default();
    let iface = counters.iface.clone().unwrap_or_default();

    let netfilter_norm = norm(drop_per_sec, scales.netfilter_drops_per_sec);
    let retrans_norm = norm(retrans, scales.retrans_per_sec);
    let ip_norm = norm(ip_in + ip_out, scales.ip_packets_per_sec);
    let activity = [
        norm(
            counters.active_processes as f64,
            scales.userspace_processes,
        ),
        norm(counters.sockstat.sockets_used as f64, scales.socket_sockets),
        norm(in_segs + out_segs, scales.tcp_segments_per_sec).max(retrans_norm),
        ip_norm,
        netfilter_norm,
        norm(rx_bps + tx_bps, scales.driver_bytes_per_sec),
        norm(rx_pps + tx_pps, scales.nic_packets_per_sec)
            .max(norm(errs_per_sec, scales.nic_errors_per_sec)),
    ];
    let layers = LAYERS
        .iter()
        .zip(activity)
        .map(|((id, label), activity)| LayerActivity {
            id: (*id).to_string(),
            label: (*label).to_string(),
            activity,
        })
        .collect();

    let layer_metrics = LayerMetrics {
        userspace: UserspaceMetrics {
            active_processes: counters.active_processes,
        },
        socket_api: SocketApiMetrics {
            active_sockets: counters.sockstat.sockets_used,
            tcp_inuse: counters.sockstat.tcp_inuse,
            udp_inuse: counters.sockstat.udp_inuse,
        },
        tcp_udp: TransportMetrics {
            established: snmp.get("Tcp.CurrEstab"),
            retrans_per_sec: retrans,
            in_segs_per_sec: in_segs,
            out_segs_per_sec: out_segs,
            udp_in_per_sec: rate_of(&samples, "udp_in"),
            udp_out_per_sec: rate_of(&samples, "udp_out"),
            sampled_sockets: socket_metrics.sockets,
            avg_cwnd: socket_metrics.avg_cwnd,
            avg_rtt_ms: socket_metrics.avg_rtt_ms,
            socket_retrans_total: socket_metrics.retrans_total,
            recv_queue_bytes: socket_metrics.recv_queue_bytes,
            send_queue_bytes: socket_metrics.send_queue_bytes,
        },
        ip: IpMetrics {
            in_packets_per_sec: ip_in,
            out_packets_per_sec: ip_out,
            forwarding: snmp.get("Ip.Forwarding") == 1,
        },
        netfilter: NetfilterMetrics {
            drop_per_sec,
            drop_ratio: (drop_per_sec / ip_in.max(1.0)).clamp(0.0, 1.0),
        },
        driver: DriverMetrics {
            iface: iface_name.clone(),
            rx_mb_s: rx_bps / BYTES_PER_MB,
            tx_mb_s: tx_bps / BYTES_PER_MB,
            rx_packets_per_sec: rx_pps,
            tx_packets_per_sec: tx_pps,
        },
        nic: NicMetrics {
            rx_errors: iface.rx_errors,
            tx_errors: iface.tx_errors,
            rx_dropped: iface.rx_dropped,
            tx_dropped: iface.tx_dropped,
            errors_per_sec: errs_per_sec,
            speed_mbps: counters.iface_speed_mbps,
        },
    };

    NetworkStackFrame {
        timestamp: now_millis(),
        iface: iface_name,
        layers,
        layer_metrics,
        signals: StackSignals {
            drop_probability: 0.03 + 0.72 * netfilter_norm,
            retransmit_probability: 0.04 + 0.71 * retrans_norm,
            packet_speed: 1.1 + 4.1 * ip_norm,
        },
        flow: select_flow(&counters.connections).cloned(),
    }
}

/// Produces network-stack frames from the kernel sources and the `ss` probe.
pub struct NetworkStackCollector {
    sources: KernelSources,
    ss: SsProbe,
    scales: NetworkStackConfig,
}

impl NetworkStackCollector {
    pub fn new(sources: KernelSources, ss: SsProbe, scales: NetworkStackConfig) -> Self {
        Self {
            sources,
            ss,
            scales,
        }
    }

    /// One poll. Source failures degrade to zero; only a failed blocking task errors.
    #[instrument(skip(self, rates), fields(aggregator = "network_stack"))]
    pub async fn frame(&self, rates: &RateTracker) -> anyhow::Result<NetworkStackFrame> {
        let sources = self.sources.clone();
        let read = tokio::task::spawn_blocking(move || {
            let counters = collect_counters(&sources);
            (counters, Instant::now())
        });
        let (read, socket_metrics) = tokio::join!(read, self.ss.probe());
        let (counters, at) = read.map_err(|e| anyhow::anyhow!("network stack task join: {}", e))?;
        let socket_metrics = degrade(socket_metrics, "ss");
        Ok(build_frame(
            &counters,
            &socket_metrics,
            rates,
            at,
            &self.scales,
        ))
    }
}
