// sysfs device enumeration: block, net, char seeds, misc/input/gpu/usb classes

use super::correlate::irq_tokens;
use crate::counters::{KernelSources, list_dir, read_attr};
use crate::models::{Bus, Device, DeviceCategory};
use std::path::{Path, PathBuf};

/// Character devices always probed (class, name).
const CHAR_SEEDS: [(&str, &str); 3] = [("tty", "tty0"), ("mem", "null"), ("mem", "random")];

/// `MAJ:MIN` from a sysfs `dev` attribute.
pub fn parse_dev_numbers(raw: &str) -> Option<(u32, u32)> {
    let (major, minor) = raw.trim().split_once(':')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn link_basename(path: &Path) -> Option<String> {
    let target = std::fs::read_link(path).ok()?;
    target.file_name()?.to_str().map(str::to_string)
}

/// Bus family from the resolved sysfs path, relative to the sysfs root when possible.
pub fn bus_from_path(resolved: &str, category: DeviceCategory) -> Bus {
    if resolved.contains("/usb") {
        Bus::Usb
    } else if resolved.contains("/virtual/") {
        Bus::Virtual
    } else if resolved.contains("/pci") {
        Bus::Pcie
    } else if category == DeviceCategory::Net {
        Bus::Net
    } else {
        Bus::Virtual
    }
}

fn resolved_path(sources: &KernelSources, entry: &Path) -> String {
    let Ok(real) = std::fs::canonicalize(entry) else {
        return entry.to_string_lossy().into_owned();
    };
    let root = std::fs::canonicalize(&sources.sys_root).unwrap_or_else(|_| sources.sys_root.clone());
    match real.strip_prefix(&root) {
        Ok(rel) => format!("/{}", rel.to_string_lossy()),
        Err(_) => real.to_string_lossy().into_owned(),
    }
}

fn display_type(category: DeviceCategory, name: &str) -> String {
    match category {
        DeviceCategory::Block => "block".into(),
        DeviceCategory::Net => "network".into(),
        DeviceCategory::Char if name.starts_with("tty") => "tty".into(),
        other => other.as_str().into(),
    }
}

fn targets(category: DeviceCategory, display_type: &str) -> Vec<String> {
    let t = match category {
        DeviceCategory::Block => "vfs",
        DeviceCategory::Net => "net",
        DeviceCategory::Input => "signals",
        _ if display_type == "tty" => "signals",
        _ => "kernel",
    };
    vec![t.to_string()]
}

/// Build a device from its sysfs entry. `driver_link` is where the driver symlink lives.
fn probe(
    sources: &KernelSources,
    category: DeviceCategory,
    name: &str,
    entry: PathBuf,
    driver_link: PathBuf,
) -> Device {
    let (major, minor) = read_attr(&entry.join("dev"))
        .and_then(|raw| parse_dev_numbers(&raw))
        .map_or((None, None), |(a, b)| (Some(a), Some(b)));
    let driver = link_basename(&driver_link);
    let bus = bus_from_path(&resolved_path(sources, &entry), category);
    let display_type = display_type(category, name);
    Device {
        name: name.to_string(),
        category,
        targets: targets(category, &display_type),
        display_type,
        bus,
        irq_tokens: irq_tokens(category, name, driver.as_deref()),
        driver,
        major,
        minor,
        throughput_bps: 0.0,
        irq_per_sec: 0.0,
        load_norm: 0.0,
    }
}

fn is_pseudo_block(name: &str) -> bool {
    ["loop", "ram", "zram"].iter().any(|p| name.starts_with(p))
}

/// Enumerate every source in fixed order. Unlistable directories contribute nothing.
pub fn enumerate(sources: &KernelSources, class_scan_limit: usize) -> Vec<Device> {
    let mut out = Vec::new();

    let block_root = sources.sys_path("block");
    for name in list_dir(&block_root)
        .into_iter()
        .filter(|n| !is_pseudo_block(n))
    {
        let entry = block_root.join(&name);
        let driver_link = entry.join("device/driver");
        out.push(probe(sources, DeviceCategory::Block, &name, entry, driver_link));
    }

    let net_root = sources.sys_path("class/net");
    for name in list_dir(&net_root) {
        let entry = net_root.join(&name);
        let driver_link = entry.join("device/driver");
        out.push(probe(sources, DeviceCategory::Net, &name, entry, driver_link));
    }

    for (class, name) in CHAR_SEEDS {
        let entry = sources.sys_path(&format!("class/{}/{}", class, name));
        if entry.exists() {
            let driver_link = entry.join("device/driver");
            out.push(probe(sources, DeviceCategory::Char, name, entry, driver_link));
        }
    }

    let classes: [(DeviceCategory, &str); 3] = [
        (DeviceCategory::Misc, "class/misc"),
        (DeviceCategory::Input, "class/input"),
        (DeviceCategory::Gpu, "class/drm"),
    ];
    for (category, rel) in classes {
        let root = sources.sys_path(rel);
        for name in list_dir(&root)
            .into_iter()
            .filter(|n| category != DeviceCategory::Gpu || (n.starts_with("card") && !n.contains('-')))
            .take(class_scan_limit)
        {
            let entry = root.join(&name);
            let driver_link = entry.join("device/driver");
            out.push(probe(sources, category, &name, entry, driver_link));
        }
    }

    let usb_root = sources.sys_path("bus/usb/devices");
    for name in list_dir(&usb_root)
        .into_iter()
        .filter(|n| !n.contains(':'))
        .take(class_scan_limit)
    {
        let entry = usb_root.join(&name);
        let driver_link = entry.join("driver");
        out.push(probe(sources, DeviceCategory::Usb, &name, entry, driver_link));
    }

    out
}
