// GET handlers: health, version, and the three telemetry snapshots

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::AppState;
use crate::counters::net;
use crate::devices::MAX_DISPLAY_LIMIT;
use crate::error::{ApiError, degrade};
use crate::models::{ConnectionList, DevicesSnapshot, IsolationContext, NetworkStackFrame};
use crate::version::{NAME, VERSION};

/// Rows returned by GET /api/active-connections.
const ACTIVE_CONNECTIONS_LIMIT: usize = 20;

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /health: liveness plus static host identity.
pub(super) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "system_info": state.system_info.as_ref(),
    }))
}

pub(super) async fn network_stack_handler(
    State(state): State<AppState>,
) -> Result<Json<NetworkStackFrame>, ApiError> {
    Ok(Json(state.network_stack.frame(&state.rates).await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct DevicesQuery {
    limit: Option<String>,
}

/// `?limit=` must be an integer in 1..=64.
pub(super) fn parse_limit(raw: Option<&str>, default: usize) -> Result<usize, ApiError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_DISPLAY_LIMIT).contains(&n) => Ok(n),
        _ => Err(ApiError::BadRequest(format!(
            "limit must be an integer between 1 and {}, got {:?}",
            MAX_DISPLAY_LIMIT, raw
        ))),
    }
}

pub(super) async fn devices_handler(
    State(state): State<AppState>,
    Query(query): Query<DevicesQuery>,
) -> Result<Json<DevicesSnapshot>, ApiError> {
    let limit = parse_limit(query.limit.as_deref(), state.devices.default_limit())?;
    Ok(Json(state.devices.snapshot(&state.rates, limit).await?))
}

pub(super) async fn isolation_handler(
    State(state): State<AppState>,
) -> Result<Json<IsolationContext>, ApiError> {
    let processes = state
        .sysinfo_repo
        .list_processes(state.isolation.max_processes())
        .await?;
    Ok(Json(state.isolation.context(processes).await?))
}

/// GET /api/active-connections: first rows of the kernel socket tables.
pub(super) async fn active_connections_handler(
    State(state): State<AppState>,
) -> Result<Json<ConnectionList>, ApiError> {
    let sources = state.sources.clone();
    let mut connections =
        tokio::task::spawn_blocking(move || degrade(net::read_connections(&sources), "connections"))
            .await?;
    connections.truncate(ACTIVE_CONNECTIONS_LIMIT);
    Ok(Json(ConnectionList { connections }))
}

pub(super) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(parse_limit(None, 20).unwrap(), 20);
        assert_eq!(parse_limit(Some("1"), 20).unwrap(), 1);
        assert_eq!(parse_limit(Some("64"), 20).unwrap(), 64);
        assert!(matches!(parse_limit(Some("0"), 20), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_limit(Some("65"), 20), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_limit(Some("ten"), 20), Err(ApiError::BadRequest(_))));
    }
}
