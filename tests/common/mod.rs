// Shared test helpers: a fake /proc + /sys tree rooted in a temp dir

#![allow(dead_code)]

use kernelscope::config::AppConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456     100    0    0    0     0          0         0   123456     100    0    0    0     0       0          0
  eth0: 1000000    2000    1    2    0     0          0         0   500000    1500    0    1    0     0       0          0
";

pub const ROUTE: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
eth0\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0
";

pub const SNMP: &str = "\
Ip: Forwarding DefaultTTL InReceives InHdrErrors InAddrErrors ForwDatagrams InUnknownProtos InDiscards InDelivers OutRequests OutDiscards OutNoRoutes
Ip: 2 64 50000 0 0 0 0 3 49000 40000 1 0
Tcp: RtoAlgorithm RtoMin RtoMax MaxConn ActiveOpens PassiveOpens AttemptFails EstabResets CurrEstab InSegs OutSegs RetransSegs InErrs OutRsts
Tcp: 1 200 120000 -1 100 50 2 3 4 30000 28000 12 0 5
Udp: InDatagrams NoPorts InErrors OutDatagrams RcvbufErrors SndbufErrors
Udp: 900 1 0 800 0 0
";

pub const NETSTAT: &str = "\
TcpExt: SyncookiesSent ListenDrops
TcpExt: 0 1
";

pub const TCP: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 1 1
   1: 0100007F:A1B2 0100007F:1F90 01 00000000:00000000 00:00000000 00000000  1000        0 2 1
   2: 0501A8C0:C350 0A01A8C0:01BB 01 00000000:00000000 00:00000000 00000000  1000        0 3 1
";

pub const SOCKSTAT: &str = "\
sockets: used 300
TCP: inuse 12 orphan 0 tw 1 alloc 14 mem 2
UDP: inuse 4 mem 1
";

pub const DISKSTATS: &str = "\
   7       0 loop0 10 0 200 1 0 0 0 0 0 1 1
   8       0 sda 1000 10 20000 300 500 20 8000 400 0 600 700
";

pub const INTERRUPTS: &str = "\
           CPU0       CPU1
  1:          9          0   IO-APIC   1-edge      i8042
  4:         20          5   IO-APIC   4-edge      ttyS0
 16:        100         50   IO-APIC  16-fasteoi   ahci[0000:00:1f.2], eth0
LOC:       5000       5000   Local timer interrupts
";

/// Fake kernel filesystems. Dropping it removes the tree.
pub struct KernelFixture {
    dir: TempDir,
}

impl KernelFixture {
    pub fn new() -> Self {
        let fx = Self {
            dir: TempDir::new().unwrap(),
        };
        fx.write_proc("net/dev", NET_DEV);
        fx.write_proc("net/route", ROUTE);
        fx.write_proc("net/snmp", SNMP);
        fx.write_proc("net/netstat", NETSTAT);
        fx.write_proc("net/tcp", TCP);
        fx.write_proc("net/sockstat", SOCKSTAT);
        fx.write_proc("diskstats", DISKSTATS);
        fx.write_proc("interrupts", INTERRUPTS);

        // sda lives under a PCI path, /sys/block holds a link to it.
        let sda = fx.write_sys(
            "devices/pci0000:00/0000:00:1f.2/ata1/host0/target0:0:0/0:0:0:0/block/sda/dev",
            "8:0\n",
        );
        fx.link_sys(sda.parent().unwrap(), "block/sda");
        fx.write_sys("devices/virtual/block/loop0/dev", "7:0\n");
        fx.link_sys(
            &fx.sys_root().join("devices/virtual/block/loop0"),
            "block/loop0",
        );
        fx.write_sys("class/net/eth0/speed", "1000\n");
        fx.write_sys("class/net/lo/speed", "-1\n");
        fx.write_sys("class/tty/tty0/dev", "4:0\n");
        fx.write_sys("class/mem/null/dev", "1:3\n");
        fx.write_sys("class/input/event0/dev", "13:64\n");
        fx.write_sys("fs/cgroup/cgroup.controllers", "cpu memory pids io\n");
        fx
    }

    pub fn proc_root(&self) -> PathBuf {
        self.dir.path().join("proc")
    }

    pub fn sys_root(&self) -> PathBuf {
        self.dir.path().join("sys")
    }

    pub fn write_proc(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.proc_root().join(rel), content)
    }

    pub fn write_sys(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.sys_root().join(rel), content)
    }

    pub fn remove_proc(&self, rel: &str) {
        std::fs::remove_file(self.proc_root().join(rel)).unwrap();
    }

    pub fn link_sys(&self, target: &Path, rel: &str) {
        let link = self.sys_root().join(rel);
        std::fs::create_dir_all(link.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(target, link).unwrap();
    }

    /// `/proc/<pid>` with a cgroup file and namespace links.
    pub fn add_process(&self, pid: u32, cgroup: &str, net_ns: &str) {
        self.write_proc(&format!("{}/cgroup", pid), &format!("0::{}\n", cgroup));
        let ns = self.proc_root().join(format!("{}/ns", pid));
        std::fs::create_dir_all(&ns).unwrap();
        for (kind, inode) in [("net", net_ns), ("mnt", "4026531841"), ("pid", "4026531836")] {
            std::os::unix::fs::symlink(format!("{}:[{}]", kind, inode), ns.join(kind)).unwrap();
        }
    }

    /// Config pointing at this tree, with a high process cap so the test process is reached.
    pub fn config(&self) -> AppConfig {
        let toml = format!(
            r#"
[server]
port = 8081
host = "127.0.0.1"

[sources]
proc_root = "{}"
sys_root = "{}"
ss_timeout_ms = 500
ss_search_dirs = []

[isolation]
max_processes = 1000000
top_cgroups = 8

[publishing]
stream_interval_ms = 50
"#,
            self.proc_root().display(),
            self.sys_root().display()
        );
        AppConfig::load_from_str(&toml).unwrap()
    }
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
    path.to_path_buf()
}
