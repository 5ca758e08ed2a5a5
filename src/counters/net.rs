// /proc/net readers: interface counters, default route, protocol counters, sockets

use super::{KernelSources, read_attr, read_source};
use crate::error::SourceUnavailable;
use crate::models::Connection;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Kernel routing-table flag for a usable route.
const RTF_UP: u32 = 0x0001;
/// Rows read from each /proc/net socket table.
const MAX_CONNECTIONS_PER_TABLE: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
}

/// Parse /proc/net/dev. The two header lines are skipped; interfaces keep file order.
pub fn parse_net_dev(content: &str) -> Vec<InterfaceCounters> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name, rest) = line.split_once(':')?;
            let fields: Vec<u64> = rest
                .split_whitespace()
                .map(|f| f.parse().ok())
                .collect::<Option<_>>()?;
            if fields.len() < 16 {
                return None;
            }
            Some(InterfaceCounters {
                name: name.trim().to_string(),
                rx_bytes: fields[0],
                rx_packets: fields[1],
                rx_errors: fields[2],
                rx_dropped: fields[3],
                tx_bytes: fields[8],
                tx_packets: fields[9],
                tx_errors: fields[10],
                tx_dropped: fields[11],
            })
        })
        .collect()
}

pub fn read_net_dev(sources: &KernelSources) -> Result<Vec<InterfaceCounters>, SourceUnavailable> {
    let path = sources.proc_path("net/dev");
    let ifaces = parse_net_dev(&read_source(&path)?);
    if ifaces.is_empty() {
        return Err(SourceUnavailable::malformed(path, "no interface rows"));
    }
    Ok(ifaces)
}

/// Interface of the first up route with destination 0.0.0.0 in /proc/net/route.
pub fn parse_default_route(content: &str) -> Option<String> {
    content.lines().skip(1).find_map(|line| {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 4 || cols[1] != "00000000" {
            return None;
        }
        let flags = u32::from_str_radix(cols[3], 16).ok()?;
        (flags & RTF_UP != 0).then(|| cols[0].to_string())
    })
}

pub fn read_default_route_iface(
    sources: &KernelSources,
) -> Result<Option<String>, SourceUnavailable> {
    Ok(parse_default_route(&read_source(
        &sources.proc_path("net/route"),
    )?))
}

/// Default outbound interface: routing table first, else the first non-loopback
/// interface that has counters.
pub fn default_iface(sources: &KernelSources, ifaces: &[InterfaceCounters]) -> Option<String> {
    match read_default_route_iface(sources) {
        Ok(Some(name)) => return Some(name),
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "routing table unavailable"),
    }
    ifaces
        .iter()
        .find(|i| i.name != "lo")
        .map(|i| i.name.clone())
}

/// Flattened `Section.Field` counters from /proc/net/snmp or /proc/net/netstat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolCounters(pub BTreeMap<String, u64>);

impl ProtocolCounters {
    /// Counter value, 0 when absent.
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn merge(&mut self, other: ProtocolCounters) {
        self.0.extend(other.0);
    }
}

/// Parse the header/value line pairs used by /proc/net/snmp and /proc/net/netstat.
/// Negative values (e.g. `Tcp.MaxConn = -1`) are not counters and are dropped.
pub fn parse_protocol_counters(content: &str) -> ProtocolCounters {
    let mut out = BTreeMap::new();
    let mut lines = content.lines();
    while let (Some(header), Some(values)) = (lines.next(), lines.next()) {
        let (Some((section, names)), Some((vsection, nums))) =
            (header.split_once(':'), values.split_once(':'))
        else {
            continue;
        };
        if section != vsection {
            continue;
        }
        for (name, raw) in names.split_whitespace().zip(nums.split_whitespace()) {
            if let Ok(v) = raw.parse::<u64>() {
                out.insert(format!("{}.{}", section, name), v);
            }
        }
    }
    ProtocolCounters(out)
}

pub fn read_snmp(sources: &KernelSources) -> Result<ProtocolCounters, SourceUnavailable> {
    let path = sources.proc_path("net/snmp");
    let counters = parse_protocol_counters(&read_source(&path)?);
    if !counters.contains("Ip.InReceives") {
        return Err(SourceUnavailable::malformed(path, "missing Ip section"));
    }
    Ok(counters)
}

pub fn read_netstat(sources: &KernelSources) -> Result<ProtocolCounters, SourceUnavailable> {
    Ok(parse_protocol_counters(&read_source(
        &sources.proc_path("net/netstat"),
    )?))
}

fn decode_ipv4(hex: &str) -> Option<IpAddr> {
    let raw = u32::from_str_radix(hex, 16).ok()?;
    Some(IpAddr::V4(Ipv4Addr::from(raw.to_le_bytes())))
}

fn decode_ipv6(hex: &str) -> Option<IpAddr> {
    if hex.len() != 32 {
        return None;
    }
    let mut bytes = [0u8; 16];
    for (i, chunk) in bytes.chunks_mut(4).enumerate() {
        let word = u32::from_str_radix(hex.get(i * 8..i * 8 + 8)?, 16).ok()?;
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    Some(IpAddr::V6(Ipv6Addr::from(bytes)))
}

/// Decode a kernel `ADDR:PORT` socket column (address in host byte order).
pub fn decode_socket_addr(col: &str) -> Option<SocketAddr> {
    let (addr_hex, port_hex) = col.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    let ip = match addr_hex.len() {
        8 => decode_ipv4(addr_hex)?,
        32 => decode_ipv6(addr_hex)?,
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

pub fn tcp_state_name(code: &str) -> &'static str {
    match code {
        "01" => "ESTABLISHED",
        "02" => "SYN_SENT",
        "03" => "SYN_RECV",
        "04" => "FIN_WAIT1",
        "05" => "FIN_WAIT2",
        "06" => "TIME_WAIT",
        "07" => "CLOSE",
        "08" => "CLOSE_WAIT",
        "09" => "LAST_ACK",
        "0A" => "LISTEN",
        "0B" => "CLOSING",
        _ => "UNKNOWN",
    }
}

fn udp_state_name(code: &str) -> &'static str {
    match code {
        "01" => "ESTABLISHED",
        "07" => "UNCONN",
        _ => "UNKNOWN",
    }
}

/// Parse one /proc/net/{tcp,tcp6,udp,udp6} table. Sockets without a remote peer
/// (listening / unconnected) are skipped.
pub fn parse_socket_table(content: &str, kind: &str) -> Vec<Connection> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            let local = decode_socket_addr(cols[1])?;
            let remote = decode_socket_addr(cols[2])?;
            if remote.ip().is_unspecified() && remote.port() == 0 {
                return None;
            }
            let state = cols[3].to_ascii_uppercase();
            let state_name = if kind == "UDP" {
                udp_state_name(&state)
            } else {
                tcp_state_name(&state)
            };
            Some(Connection {
                kind: kind.to_string(),
                local: local.to_string(),
                remote: remote.to_string(),
                remote_ip: Some(remote.ip()),
                state,
                state_name: state_name.to_string(),
            })
        })
        .take(MAX_CONNECTIONS_PER_TABLE)
        .collect()
}

/// Active connections across the TCP and UDP tables. Fails only when none of the
/// tables could be read.
pub fn read_connections(sources: &KernelSources) -> Result<Vec<Connection>, SourceUnavailable> {
    let mut out = Vec::new();
    let mut last_err = None;
    let mut any_read = false;
    for (rel, kind) in [
        ("net/tcp", "TCP"),
        ("net/tcp6", "TCP"),
        ("net/udp", "UDP"),
        ("net/udp6", "UDP"),
    ] {
        match read_source(&sources.proc_path(rel)) {
            Ok(content) => {
                any_read = true;
                out.extend(parse_socket_table(&content, kind));
            }
            Err(e) => last_err = Some(e),
        }
    }
    match (any_read, last_err) {
        (false, Some(e)) => Err(e),
        _ => Ok(out),
    }
}

/// Link speed in Mbit/s from /sys/class/net/<iface>/speed; `None` when unknown.
pub fn interface_speed_mbps(sources: &KernelSources, iface: &str) -> Option<u64> {
    let raw = read_attr(&sources.sys_path(&format!("class/net/{}/speed", iface)))?;
    let mbps = raw.parse::<i64>().ok()?;
    (mbps > 0).then_some(mbps as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456     100    0    0    0     0          0         0   123456     100    0    0    0     0       0          0
  eth0:1000000    2000    3    4    0     0          0         5   500000    1500    6    7    0     0       0          0
";

    #[test]
    fn net_dev_parses_rx_and_tx_columns() {
        let ifaces = parse_net_dev(NET_DEV);
        assert_eq!(ifaces.len(), 2);
        let eth0 = &ifaces[1];
        assert_eq!(eth0.name, "eth0");
        assert_eq!(eth0.rx_bytes, 1_000_000);
        assert_eq!(eth0.rx_packets, 2000);
        assert_eq!(eth0.rx_errors, 3);
        assert_eq!(eth0.rx_dropped, 4);
        assert_eq!(eth0.tx_bytes, 500_000);
        assert_eq!(eth0.tx_packets, 1500);
        assert_eq!(eth0.tx_errors, 6);
        assert_eq!(eth0.tx_dropped, 7);
    }

    #[test]
    fn net_dev_skips_short_rows() {
        let content = "h1\nh2\n  eth0: 1 2 3\n";
        assert!(parse_net_dev(content).is_empty());
    }

    #[test]
    fn default_route_requires_zero_destination_and_up_flag() {
        let route = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
wlan0\t0010A8C0\t00000000\t0001\t0\t0\t600\t00FFFFFF\t0\t0\t0
docker0\t00000000\t00000000\t0000\t0\t0\t0\t00000000\t0\t0\t0
eth0\t00000000\t0100A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
";
        assert_eq!(parse_default_route(route).as_deref(), Some("eth0"));
        assert_eq!(parse_default_route("Iface Destination\n"), None);
    }

    #[test]
    fn default_iface_falls_back_to_first_non_loopback() {
        let sources = KernelSources::new("/nonexistent/proc", "/nonexistent/sys");
        let ifaces = parse_net_dev(NET_DEV);
        assert_eq!(default_iface(&sources, &ifaces).as_deref(), Some("eth0"));
        assert_eq!(default_iface(&sources, &ifaces[..1]), None);
    }

    #[test]
    fn protocol_counters_pair_headers_with_values() {
        let snmp = "\
Ip: Forwarding DefaultTTL InReceives InDiscards
Ip: 1 64 5000 2
Tcp: RtoAlgorithm MaxConn CurrEstab RetransSegs
Tcp: 1 -1 12 40
";
        let c = parse_protocol_counters(snmp);
        assert_eq!(c.get("Ip.InReceives"), 5000);
        assert_eq!(c.get("Ip.InDiscards"), 2);
        assert_eq!(c.get("Tcp.CurrEstab"), 12);
        assert_eq!(c.get("Tcp.RetransSegs"), 40);
        assert!(!c.contains("Tcp.MaxConn"));
        assert_eq!(c.get("Udp.InDatagrams"), 0);
    }

    #[test]
    fn socket_addr_decodes_little_endian_ipv4() {
        let addr = decode_socket_addr("0100007F:1F90").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn socket_addr_decodes_ipv6_loopback() {
        let addr = decode_socket_addr("00000000000000000000000001000000:0016").unwrap();
        assert_eq!(addr.ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(addr.port(), 22);
    }

    #[test]
    fn socket_table_skips_listeners_and_names_states() {
        let table = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1 1
   1: 0F02000A:A1B2 2E1DB85D:01BB 01 00000000:00000000 00:00000000 00000000  1000        0 2 1
";
        let conns = parse_socket_table(table, "TCP");
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].local, "10.0.2.15:41394");
        assert_eq!(conns[0].remote, "93.184.29.46:443");
        assert_eq!(conns[0].state_name, "ESTABLISHED");
        assert_eq!(conns[0].kind, "TCP");
    }

    #[test]
    fn connections_unavailable_only_when_every_table_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let sources = KernelSources::new(dir.path(), dir.path());
        assert!(read_connections(&sources).is_err());

        std::fs::create_dir(dir.path().join("net")).unwrap();
        std::fs::write(dir.path().join("net/udp"), "header\n").unwrap();
        assert!(read_connections(&sources).unwrap().is_empty());
    }
}
