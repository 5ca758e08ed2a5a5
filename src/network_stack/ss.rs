// Per-socket TCP internals via the iproute2 `ss` tool (best effort)

use crate::error::SourceUnavailable;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Aggregated `ss -tin` view. All zero when the tool is unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocketMetrics {
    pub sockets: u64,
    pub avg_cwnd: f64,
    pub avg_rtt_ms: f64,
    pub retrans_total: u64,
    pub recv_queue_bytes: u64,
    pub send_queue_bytes: u64,
}

/// Locate an executable on PATH, then in the extra directories.
pub fn resolve_program(program: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    let path_dirs = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
        .unwrap_or_default();
    path_dirs
        .iter()
        .chain(extra_dirs.iter())
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn value_after<'a>(token: &'a str, key: &str) -> Option<&'a str> {
    token.strip_prefix(key)?.strip_prefix(':')
}

/// Parse `ss -tinH` output: one state line per socket (`STATE RECV-Q SEND-Q LOCAL PEER`)
/// followed by an indented detail line with `cwnd:`, `rtt:avg/var`, `retrans:cur/total`.
pub fn parse_ss_output(output: &str) -> SocketMetrics {
    let mut m = SocketMetrics::default();
    let (mut cwnd_sum, mut cwnd_n) = (0.0, 0u64);
    let (mut rtt_sum, mut rtt_n) = (0.0, 0u64);
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() >= 5 {
                m.sockets += 1;
                m.recv_queue_bytes += cols[1].parse::<u64>().unwrap_or(0);
                m.send_queue_bytes += cols[2].parse::<u64>().unwrap_or(0);
            }
            continue;
        }
        for token in line.split_whitespace() {
            if let Some(v) = value_after(token, "cwnd").and_then(|v| v.parse::<f64>().ok()) {
                cwnd_sum += v;
                cwnd_n += 1;
            } else if let Some(v) = value_after(token, "rtt")
                .and_then(|v| v.split('/').next())
                .and_then(|v| v.parse::<f64>().ok())
            {
                rtt_sum += v;
                rtt_n += 1;
            } else if let Some(v) = value_after(token, "retrans") {
                let total = v.rsplit('/').next().unwrap_or(v);
                m.retrans_total += total.parse::<u64>().unwrap_or(0);
            }
        }
    }
    if cwnd_n > 0 {
        m.avg_cwnd = cwnd_sum / cwnd_n as f64;
    }
    if rtt_n > 0 {
        m.avg_rtt_ms = rtt_sum / rtt_n as f64;
    }
    m
}

/// Runs `ss` with a hard timeout.
#[derive(Debug, Clone)]
pub struct SsProbe {
    search_dirs: Vec<PathBuf>,
    timeout: Duration,
}

impl SsProbe {
    pub fn new(search_dirs: Vec<PathBuf>, timeout: Duration) -> Self {
        Self {
            search_dirs,
            timeout,
        }
    }

    pub async fn probe(&self) -> Result<SocketMetrics, SourceUnavailable> {
        let program = resolve_program("ss", &self.search_dirs).ok_or_else(|| {
            SourceUnavailable::Command {
                program: "ss".into(),
                reason: "not found on PATH or search dirs".into(),
            }
        })?;
        run_ss(&program, self.timeout).await
    }
}

async fn run_ss(program: &Path, timeout: Duration) -> Result<SocketMetrics, SourceUnavailable> {
    let unavailable = |reason: String| SourceUnavailable::Command {
        program: program.display().to_string(),
        reason,
    };
    let output = tokio::time::timeout(
        timeout,
        Command::new(program)
            .arg("-tinH")
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| unavailable(format!("timed out after {:?}", timeout)))?
    .map_err(|e| unavailable(e.to_string()))?;
    if !output.status.success() {
        return Err(unavailable(format!("exited with {}", output.status)));
    }
    Ok(parse_ss_output(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SS_OUTPUT: &str = "\
ESTAB 0      36     192.168.1.5:22      192.168.1.10:51234
\t cubic wscale:7,7 rto:204 rtt:0.5/0.25 ato:40 mss:1448 cwnd:10 bytes_acked:1200 retrans:0/2
ESTAB 12     0      192.168.1.5:443     203.0.113.9:40000
\t bbr rto:220 rtt:20.5/3 mss:1448 cwnd:30 retrans:1/3 send 1.2Mbps
";

    #[test]
    fn parses_queues_cwnd_rtt_retrans() {
        let m = parse_ss_output(SS_OUTPUT);
        assert_eq!(m.sockets, 2);
        assert_eq!(m.recv_queue_bytes, 12);
        assert_eq!(m.send_queue_bytes, 36);
        assert!((m.avg_cwnd - 20.0).abs() < 1e-9);
        assert!((m.avg_rtt_ms - 10.5).abs() < 1e-9);
        assert_eq!(m.retrans_total, 5);
    }

    #[test]
    fn empty_output_is_all_zero() {
        assert_eq!(parse_ss_output(""), SocketMetrics::default());
    }

    #[test]
    fn resolve_program_checks_extra_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let fake = dir.path().join("kernelscope-test-tool");
        std::fs::write(&fake, "#!/bin/sh\n").unwrap();
        let found = resolve_program("kernelscope-test-tool", &[dir.path().to_path_buf()]);
        assert_eq!(found, Some(fake));
        assert_eq!(
            resolve_program("kernelscope-missing-tool", &[dir.path().to_path_buf()]),
            None
        );
    }

    #[tokio::test]
    async fn missing_tool_is_unavailable_not_panic() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("ss");
        let r = run_ss(&missing, Duration::from_millis(200)).await;
        assert!(matches!(r, Err(SourceUnavailable::Command { .. })));
    }
}
