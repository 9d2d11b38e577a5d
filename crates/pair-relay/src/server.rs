use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pair_core::PeerId;

use crate::error::RelayError;
use crate::frames::{ClientFrame, RelayFrame};
use crate::registry::PeerRegistry;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Relay server configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind_host: String,
    pub port: u16,
    pub max_send_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            port: 9000,
            max_send_queue: 256,
        }
    }
}

#[derive(Clone)]
pub struct RelayState {
    pub registry: Arc<PeerRegistry>,
}

pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/peer", get(peer_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve the relay in the background.
pub async fn start(config: RelayConfig) -> Result<RelayHandle, RelayError> {
    let registry = Arc::new(PeerRegistry::new(config.max_send_queue));
    let router = build_router(RelayState {
        registry: Arc::clone(&registry),
    });

    let addr = format!("{}:{}", config.bind_host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(port = local_addr.port(), host = %config.bind_host, "relay started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "relay server stopped");
        }
    });

    Ok(RelayHandle {
        port: local_addr.port(),
        registry,
        server,
    })
}

/// Handle returned by [`start`]. The server runs until this is shut down or
/// dropped with the runtime.
pub struct RelayHandle {
    pub port: u16,
    pub registry: Arc<PeerRegistry>,
    server: tokio::task::JoinHandle<()>,
}

impl RelayHandle {
    pub fn shutdown(self) {
        self.server.abort();
    }
}

#[derive(Debug, Deserialize)]
struct PeerQuery {
    id: Option<String>,
}

async fn peer_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<PeerQuery>,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    let requested = query.id.filter(|id| !id.trim().is_empty()).map(PeerId::from_raw);
    ws.on_upgrade(move |socket| handle_socket(socket, requested, state))
}

async fn health_handler(State(state): State<RelayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "peers": state.registry.count(),
    }))
}

async fn handle_socket(mut socket: WebSocket, requested: Option<PeerId>, state: RelayState) {
    let (peer_id, rx) = match state.registry.register(requested) {
        Ok(registered) => registered,
        Err(e) => {
            tracing::info!(error = %e, "refusing peer");
            if let Ok(text) = serde_json::to_string(&RelayFrame::error(None, e.code())) {
                let _ = socket.send(WsMessage::Text(text.into())).await;
            }
            let _ = socket.send(WsMessage::Close(None)).await;
            return;
        }
    };
    tracing::info!(peer_id = %peer_id, "peer connected");
    state.registry.send_to(&peer_id, &RelayFrame::Open { id: peer_id.to_string() });

    serve_peer(socket, peer_id.clone(), rx, Arc::clone(&state.registry)).await;

    state.registry.unregister(&peer_id);
    tracing::info!(peer_id = %peer_id, "peer disconnected");
}

/// Split into writer and reader tasks; returns when either side ends.
async fn serve_peer(socket: WebSocket, peer_id: PeerId, mut rx: mpsc::Receiver<String>, registry: Arc<PeerRegistry>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping_interval.tick().await;
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(text) => {
                        if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => handle_frame(&registry, &peer_id, text.as_str()),
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }
}

fn handle_frame(registry: &PeerRegistry, peer_id: &PeerId, text: &str) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(peer_id = %peer_id, error = %e, "bad frame");
            registry.send_to(peer_id, &RelayFrame::error(None, RelayError::BadFrame(e.to_string()).code()));
            return;
        }
    };
    let (channel, result) = match frame {
        ClientFrame::Dial { channel, target } => {
            let result = registry.dial(peer_id, &channel, &PeerId::from_raw(target));
            (channel, result)
        }
        ClientFrame::Data { channel, payload } => {
            let result = registry.forward(peer_id, &channel, payload);
            (channel, result)
        }
        ClientFrame::Close { channel } => {
            let result = registry.close(peer_id, &channel);
            (channel, result)
        }
    };
    if let Err(e) = result {
        tracing::debug!(peer_id = %peer_id, channel = %channel, error = %e, "frame refused");
        registry.send_to(peer_id, &RelayFrame::error(Some(&channel), e.code()));
    }
}
