// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::counters::KernelSources;
use crate::devices::DeviceTopologyBuilder;
use crate::isolation::IsolationAggregator;
use crate::models::SystemInfo;
use crate::network_stack::NetworkStackCollector;
use crate::network_stack::ss::SsProbe;
use crate::rate::RateTracker;
use crate::sysinfo_repo::SysinfoRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) sources: KernelSources,
    /// Baselines shared by every HTTP poller. WebSocket streams own their own.
    pub(crate) rates: Arc<RateTracker>,
    pub(crate) network_stack: Arc<NetworkStackCollector>,
    pub(crate) devices: Arc<DeviceTopologyBuilder>,
    pub(crate) isolation: Arc<IsolationAggregator>,
    pub(crate) sysinfo_repo: Arc<SysinfoRepo>,
    pub(crate) system_info: Arc<SystemInfo>,
    pub(crate) config: AppConfig,
}

pub fn app(
    sysinfo_repo: Arc<SysinfoRepo>,
    system_info: Arc<SystemInfo>,
    config: AppConfig,
) -> Router {
    let sources = KernelSources::from(&config.sources);
    let ss = SsProbe::new(
        config.sources.ss_search_dirs.clone(),
        Duration::from_millis(config.sources.ss_timeout_ms),
    );
    let state = AppState {
        network_stack: Arc::new(NetworkStackCollector::new(
            sources.clone(),
            ss,
            config.network_stack.clone(),
        )),
        devices: Arc::new(DeviceTopologyBuilder::new(
            sources.clone(),
            config.devices.clone(),
        )),
        isolation: Arc::new(IsolationAggregator::new(
            sources.clone(),
            config.isolation.clone(),
        )),
        rates: Arc::new(RateTracker::new()),
        sources,
        sysinfo_repo,
        system_info,
        config,
    };
    Router::new()
        .route("/", get(|| async { "kernelscope: kernel telemetry backend" })) // GET /
        .route("/health", get(http::health_handler)) // GET /health
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/network-stack-realtime", get(http::network_stack_handler))
        .route("/api/devices-realtime", get(http::devices_handler))
        .route("/api/isolation-context", get(http::isolation_handler))
        .route("/api/active-connections", get(http::active_connections_handler))
        .route("/ws/network-stack", get(ws::ws_network_stack)) // WS /ws/network-stack
        .route("/ws/devices", get(ws::ws_devices)) // WS /ws/devices
        .fallback(http::not_found)
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
