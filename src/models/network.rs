// Network-stack frame and connection models

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One active socket from /proc/net/{tcp,tcp6,udp,udp6}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(rename = "type")]
    pub kind: String,
    pub local: String,
    pub remote: String,
    #[serde(skip)]
    pub remote_ip: Option<IpAddr>,
    /// Raw kernel state code, hex (e.g. "01").
    pub state: String,
    pub state_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerActivity {
    pub id: String,
    pub label: String,
    /// Normalized to [0, 1] against a tuning constant.
    pub activity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserspaceMetrics {
    pub active_processes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocketApiMetrics {
    pub active_sockets: u64,
    pub tcp_inuse: u64,
    pub udp_inuse: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportMetrics {
    pub established: u64,
    pub retrans_per_sec: f64,
    pub in_segs_per_sec: f64,
    pub out_segs_per_sec: f64,
    pub udp_in_per_sec: f64,
    pub udp_out_per_sec: f64,
    /// Sockets reported by `ss`; 0 when the tool is unavailable.
    pub sampled_sockets: u64,
    pub avg_cwnd: f64,
    pub avg_rtt_ms: f64,
    pub socket_retrans_total: u64,
    pub recv_queue_bytes: u64,
    pub send_queue_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpMetrics {
    pub in_packets_per_sec: f64,
    pub out_packets_per_sec: f64,
    pub forwarding: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetfilterMetrics {
    pub drop_per_sec: f64,
    pub drop_ratio: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverMetrics {
    pub iface: Option<String>,
    pub rx_mb_s: f64,
    pub tx_mb_s: f64,
    pub rx_packets_per_sec: f64,
    pub tx_packets_per_sec: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NicMetrics {
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub errors_per_sec: f64,
    pub speed_mbps: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerMetrics {
    pub userspace: UserspaceMetrics,
    pub socket_api: SocketApiMetrics,
    pub tcp_udp: TransportMetrics,
    pub ip: IpMetrics,
    pub netfilter: NetfilterMetrics,
    pub driver: DriverMetrics,
    pub nic: NicMetrics,
}

/// Rendering hints for the packet animation. Monotonic in the underlying rates and
/// bounded to display ranges; not statistical probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSignals {
    pub drop_probability: f64,
    pub retransmit_probability: f64,
    pub packet_speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStackFrame {
    pub timestamp: u64,
    pub iface: Option<String>,
    pub layers: Vec<LayerActivity>,
    pub layer_metrics: LayerMetrics,
    pub signals: StackSignals,
    pub flow: Option<Connection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionList {
    pub connections: Vec<Connection>,
}
