// Wire models (JSON, snake_case to match the visualization front end)

mod device;
mod isolation;
mod network;
mod system;

pub use device::{Bus, Device, DeviceCategory, DevicesMeta, DevicesSnapshot};
pub use isolation::{CgroupAggregate, IsolationContext, NamespaceSummary};
pub use network::{
    Connection, ConnectionList, DriverMetrics, IpMetrics, LayerActivity, LayerMetrics,
    NetfilterMetrics, NetworkStackFrame, NicMetrics, SocketApiMetrics, StackSignals,
    TransportMetrics, UserspaceMetrics,
};
pub use system::{ProcessInfo, SystemInfo};

/// Milliseconds since the Unix epoch; 0 if the clock is before it.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
