// /proc/net/sockstat reader

use super::{KernelSources, read_source};
use crate::error::SourceUnavailable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SockStat {
    pub sockets_used: u64,
    pub tcp_inuse: u64,
    pub udp_inuse: u64,
}

fn field(rest: &str, key: &str) -> Option<u64> {
    let mut it = rest.split_whitespace();
    while let Some(k) = it.next() {
        if k == key {
            return it.next()?.parse().ok();
        }
    }
    None
}

pub fn parse_sockstat(content: &str) -> SockStat {
    let mut out = SockStat::default();
    for line in content.lines() {
        let Some((section, rest)) = line.split_once(':') else {
            continue;
        };
        match section {
            "sockets" => out.sockets_used = field(rest, "used").unwrap_or(0),
            "TCP" => out.tcp_inuse = field(rest, "inuse").unwrap_or(0),
            "UDP" => out.udp_inuse = field(rest, "inuse").unwrap_or(0),
            _ => {}
        }
    }
    out
}

pub fn read_sockstat(sources: &KernelSources) -> Result<SockStat, SourceUnavailable> {
    Ok(parse_sockstat(&read_source(
        &sources.proc_path("net/sockstat"),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sockstat_reads_used_and_inuse() {
        let content = "\
sockets: used 812
TCP: inuse 23 orphan 0 tw 4 alloc 30 mem 3
UDP: inuse 9 mem 2
UDPLITE: inuse 0
";
        let s = parse_sockstat(content);
        assert_eq!(s.sockets_used, 812);
        assert_eq!(s.tcp_inuse, 23);
        assert_eq!(s.udp_inuse, 9);
    }
}
