// Device topology models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Block,
    Net,
    Char,
    Misc,
    Input,
    Gpu,
    Usb,
}

impl DeviceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceCategory::Block => "block",
            DeviceCategory::Net => "net",
            DeviceCategory::Char => "char",
            DeviceCategory::Misc => "misc",
            DeviceCategory::Input => "input",
            DeviceCategory::Gpu => "gpu",
            DeviceCategory::Usb => "usb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    Pcie,
    Usb,
    Virtual,
    Net,
}

impl Bus {
    pub fn as_str(self) -> &'static str {
        match self {
            Bus::Pcie => "pcie",
            Bus::Usb => "usb",
            Bus::Virtual => "virtual",
            Bus::Net => "net",
        }
    }
}

/// One enumerated kernel device for a single poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub category: DeviceCategory,
    /// Display family used by the front end for colouring (block, network, tty, ...).
    #[serde(rename = "type")]
    pub display_type: String,
    pub bus: Bus,
    pub driver: Option<String>,
    pub major: Option<u32>,
    pub minor: Option<u32>,
    /// Substrings matched against /proc/interrupts lines.
    #[serde(skip)]
    pub irq_tokens: Vec<String>,
    pub throughput_bps: f64,
    pub irq_per_sec: f64,
    pub load_norm: f64,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicesMeta {
    pub count: usize,
    pub max_throughput_bps: f64,
    pub bus_counts: BTreeMap<String, usize>,
    pub category_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesSnapshot {
    pub timestamp: u64,
    pub layout: String,
    pub devices: Vec<Device>,
    pub meta: DevicesMeta,
}
