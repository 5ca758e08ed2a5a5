// /proc/interrupts reader

use super::{KernelSources, read_source};
use crate::error::SourceUnavailable;

/// One interrupt-accounting row: the whole line lowercased (label, chip, device names)
/// and the count summed across CPUs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptLine {
    pub text: String,
    pub total: u64,
}

/// Parse /proc/interrupts. The CPU header row is skipped; per-CPU columns are the
/// numeric fields directly after the `NN:` label.
pub fn parse_interrupts(content: &str) -> Vec<InterruptLine> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let (_, rest) = line.split_once(':')?;
            let total = rest
                .split_whitespace()
                .map_while(|f| f.parse::<u64>().ok())
                .fold(0u64, |acc, v| acc.saturating_add(v));
            Some(InterruptLine {
                text: line.trim().to_lowercase(),
                total,
            })
        })
        .collect()
}

pub fn read_interrupts(sources: &KernelSources) -> Result<Vec<InterruptLine>, SourceUnavailable> {
    Ok(parse_interrupts(&read_source(
        &sources.proc_path("interrupts"),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupts_sum_cpu_columns() {
        let content = "\
           CPU0       CPU1
  0:         36          0   IO-APIC    2-edge      timer
 16:       1200        800   IO-APIC   16-fasteoi   ehci_hcd:usb1, eth0
124:        500        250   PCI-MSI 524288-edge      nvme0q1
NMI:          3          4   Non-maskable interrupts
ERR:          0
";
        let lines = parse_interrupts(content);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].total, 36);
        assert_eq!(lines[1].total, 2000);
        assert!(lines[1].text.contains("ehci_hcd:usb1, eth0"));
        assert_eq!(lines[2].total, 750);
        assert_eq!(lines[3].total, 7);
        assert!(lines[3].text.starts_with("nmi:"));
        assert_eq!(lines[4].total, 0);
    }
}
