// /proc/diskstats reader

use super::{KernelSources, read_source};
use crate::error::SourceUnavailable;

/// Bytes per diskstats sector, fixed by the kernel regardless of the device's block size.
pub const SECTOR_BYTES: u64 = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCounters {
    pub major: u32,
    pub minor: u32,
    pub name: String,
    pub sectors_read: u64,
    pub sectors_written: u64,
}

impl DiskCounters {
    pub fn sectors_total(&self) -> u64 {
        self.sectors_read.saturating_add(self.sectors_written)
    }
}

pub fn parse_diskstats(content: &str) -> Vec<DiskCounters> {
    content
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 10 {
                return None;
            }
            Some(DiskCounters {
                major: cols[0].parse().ok()?,
                minor: cols[1].parse().ok()?,
                name: cols[2].to_string(),
                sectors_read: cols[5].parse().ok()?,
                sectors_written: cols[9].parse().ok()?,
            })
        })
        .collect()
}

pub fn read_diskstats(sources: &KernelSources) -> Result<Vec<DiskCounters>, SourceUnavailable> {
    Ok(parse_diskstats(&read_source(
        &sources.proc_path("diskstats"),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diskstats_reads_sector_columns() {
        let content = "\
   8       0 sda 4520 1201 318222 2233 9100 8800 772000 9012 0 5120 11245 0 0 0 0
 259       0 nvme0n1 100 0 2048 10 50 0 4096 20 0 30 30
   7       0 loop0 bad
";
        let disks = parse_diskstats(content);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].name, "sda");
        assert_eq!((disks[0].major, disks[0].minor), (8, 0));
        assert_eq!(disks[0].sectors_read, 318_222);
        assert_eq!(disks[0].sectors_written, 772_000);
        assert_eq!(disks[1].sectors_total(), 6144);
    }
}
