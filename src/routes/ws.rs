// WebSocket handlers: periodic network-stack and device frames

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::rate::RateTracker;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_network_stack(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let collector = state.network_stack.clone();
    let interval_ms = state.config.publishing.stream_interval_ms;
    ws.on_upgrade(move |socket| async move {
        // Private baselines so a stream's cadence does not skew HTTP pollers.
        let rates = Arc::new(RateTracker::new());
        let next = move || {
            let collector = collector.clone();
            let rates = rates.clone();
            async move { collector.frame(&rates).await }
        };
        if let Err(e) = stream_frames(socket, "network-stack", interval_ms, next).await {
            tracing::info!("Network stack stream error: {}", e);
        }
    })
}

pub(super) async fn ws_devices(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let builder = state.devices.clone();
    let interval_ms = state.config.publishing.stream_interval_ms;
    ws.on_upgrade(move |socket| async move {
        let rates = Arc::new(RateTracker::new());
        let next = move || {
            let builder = builder.clone();
            let rates = rates.clone();
            async move {
                let limit = builder.default_limit();
                builder.snapshot(&rates, limit).await
            }
        };
        if let Err(e) = stream_frames(socket, "devices", interval_ms, next).await {
            tracing::info!("Devices stream error: {}", e);
        }
    })
}

async fn send_or_close(socket: &mut WebSocket, msg: Message) -> bool {
    let r = timeout(WS_SEND_TIMEOUT, socket.send(msg)).await;
    matches!(r, Ok(Ok(())))
}

/// Sends one JSON frame per tick until the client goes away or a send stalls.
async fn stream_frames<F, Fut, T>(
    mut socket: WebSocket,
    stream: &'static str,
    interval_ms: u64,
    mut next: F,
) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    T: Serialize,
{
    tracing::info!(stream, "Client connected");
    let mut tick = tokio::time::interval(Duration::from_millis(interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let frame = next().await?;
                let json = serde_json::to_string(&frame)?;
                if !send_or_close(&mut socket, Message::Text(json.into())).await {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if !send_or_close(&mut socket, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    tracing::info!(stream, "Client disconnected");
    Ok(())
}
