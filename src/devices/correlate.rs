// Approximate device <-> interrupt-line matching.
//
// The kernel exposes no generic device-to-IRQ map, so a device is credited with every
// /proc/interrupts line whose text contains one of its tokens. Lines shared by several
// devices (e.g. an ehci controller line also naming eth0) are counted for each of them.

use crate::counters::interrupts::InterruptLine;
use crate::models::DeviceCategory;

/// Tokens shorter than this match too much unrelated text ("lo" in "local timer").
const MIN_TOKEN_LEN: usize = 3;

/// Controller prefix of an NVMe namespace name: `nvme0n1` -> `nvme0`.
fn nvme_controller(name: &str) -> Option<&str> {
    let rest = name.strip_prefix("nvme")?;
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    (digits > 0).then(|| &name[..4 + digits])
}

/// Lowercased substrings identifying a device in interrupt labels.
pub fn irq_tokens(category: DeviceCategory, name: &str, driver: Option<&str>) -> Vec<String> {
    let name = name.to_lowercase();
    let mut tokens = vec![name.clone()];
    if let Some(d) = driver {
        tokens.push(d.to_lowercase());
    }
    match category {
        DeviceCategory::Char if name.starts_with("tty") => {
            tokens.extend(["tty".to_string(), "serial".to_string()]);
        }
        DeviceCategory::Block if name.starts_with("sd") => tokens.push("ahci".into()),
        DeviceCategory::Block => {
            if let Some(ctrl) = nvme_controller(&name) {
                tokens.push(ctrl.to_string());
            }
        }
        DeviceCategory::Input => tokens.push("i8042".into()),
        DeviceCategory::Usb => tokens.extend(["xhci".to_string(), "ehci".to_string()]),
        _ => {}
    }
    tokens.retain(|t| t.len() >= MIN_TOKEN_LEN);
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Sum of the totals of every interrupt line containing any token.
pub fn correlate(tokens: &[String], lines: &[InterruptLine]) -> u64 {
    lines
        .iter()
        .filter(|line| tokens.iter().any(|t| line.text.contains(t.as_str())))
        .fold(0u64, |acc, line| acc.saturating_add(line.total))
}
