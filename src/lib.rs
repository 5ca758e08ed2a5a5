// Kernel telemetry backend: counter readers, rate engine, aggregators, HTTP surface

pub mod config;
pub mod counters;
pub mod devices;
pub mod error;
pub mod isolation;
pub mod models;
pub mod network_stack;
pub mod rate;
pub mod routes;
pub mod sysinfo_repo;
pub mod version;
