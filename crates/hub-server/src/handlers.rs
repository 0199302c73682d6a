//! HTTP and WebSocket handlers for the hub server.
//!
//! The connector posts events to the webhook; overlays hold a WebSocket open
//! and receive a `hello` frame with the current snapshot followed by one
//! `event` frame per notification.

use crate::config::Config;
use crate::metrics;
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use hub_protocol::{codec, now_millis, Encoded, Encoding, Frame};
use royale_hub_core::{Hub, SubscriptionId};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The event hub.
    pub hub: Hub,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state, loading the game tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured game tables cannot be loaded.
    pub fn new(config: Config) -> Result<Self> {
        let tables = Arc::new(config.game_config()?);
        Ok(Self {
            hub: Hub::with_config(tables, config.hub_config()),
            config,
        })
    }
}

/// Query parameters of the stream endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    /// `json` (default) or `msgpack`.
    pub format: Option<String>,
}

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let transport = state.config.transport.clone();
    Router::new()
        .route(&transport.websocket_path, get(ws_handler))
        .route(&transport.webhook_path, post(webhook_handler))
        .route("/test-event", post(test_event_handler))
        .route("/config", get(config_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone())?);

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let app = build_router(state);

    // Bind and serve
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Royale hub listening on {}", addr);
    info!(
        "Webhook endpoint: http://{}{}",
        addr, config.transport.webhook_path
    );
    info!(
        "Overlay stream: ws://{}{}",
        addr, config.transport.websocket_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.hub.stats();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "players": stats.players,
        "queue": stats.queue_len,
        "log": stats.log_len,
        "subscribers": stats.subscribers,
    }))
}

/// Read-only game tables.
async fn config_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.hub.lookup().as_ref().clone())
}

/// Inbound event webhook.
///
/// Malformed bodies are rejected here and never reach the hub.
async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let event = match codec::decode_event(&body, state.config.limits.max_event_size) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Rejected inbound event");
            metrics::record_rejected();
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": e.to_string() })),
            );
        }
    };

    debug!(kind = event.kind(), user = %event.user(), "Received event");
    metrics::record_event(event.kind());

    let report = state.hub.ingest(&event);
    metrics::record_dispatch(report.elapsed.as_secs_f64());
    for notification in &report.notifications {
        metrics::record_notification(notification.category());
    }
    metrics::record_fanout(report.publish.delivered, report.publish.dropped);
    if report.publish.dropped > 0 {
        metrics::set_active_subscribers(state.hub.stats().subscribers);
    }

    (
        StatusCode::OK,
        Json(json!({ "ok": true, "notifications": report.notifications.len() })),
    )
}

/// Diagnostic: publish the fixed test gift.
async fn test_event_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = state.hub.inject_test_event();
    metrics::record_notification("gift");
    metrics::record_fanout(report.delivered, report.dropped);
    Json(json!({ "ok": true, "delivered": report.delivered }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<StreamParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let encoding = Encoding::from_query(params.format.as_deref());
    ws.on_upgrade(move |socket| handle_websocket(socket, state, encoding))
}

/// Removes the subscription when the connection task ends.
struct SubscriberGuard {
    state: Arc<AppState>,
    id: SubscriptionId,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.state.hub.unsubscribe(self.id);
        metrics::set_active_subscribers(self.state.hub.stats().subscribers);
    }
}

/// Handle an overlay connection.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>, encoding: Encoding) {
    let (mut sender, mut receiver) = socket.split();

    let (mut subscription, snapshot) = match state.hub.subscribe() {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "Subscribe failed");
            metrics::record_error("subscribe");
            let _ = send_frame(&mut sender, &Frame::error(1001, e.to_string()), encoding).await;
            let _ = sender.close().await;
            return;
        }
    };
    let _guard = SubscriberGuard {
        state: Arc::clone(&state),
        id: subscription.id(),
    };
    metrics::set_active_subscribers(state.hub.stats().subscribers);

    let connection_id = format!("conn_{}", subscription.id());
    debug!(connection = %connection_id, ?encoding, "WebSocket connected");

    let interval_ms = state.config.heartbeat.interval_ms.max(1);
    let hello = Frame::hello(
        &connection_id,
        u32::try_from(interval_ms).unwrap_or(u32::MAX),
        snapshot,
    );
    if send_frame(&mut sender, &hello, encoding).await.is_err() {
        error!(connection = %connection_id, "Failed to send hello frame");
        return;
    }

    let period = Duration::from_millis(interval_ms);
    let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;

            notification = subscription.recv() => {
                let Some(notification) = notification else {
                    debug!(connection = %connection_id, "Subscription dropped by hub");
                    break;
                };
                let frame = Frame::event(notification.as_ref().clone());
                if send_frame(&mut sender, &frame, encoding).await.is_err() {
                    break;
                }
            }

            _ = heartbeat.tick() => {
                if send_frame(&mut sender, &Frame::ping(now_millis()), encoding).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match codec::decode_text(&text) {
                            Ok(Frame::Ping { timestamp }) => Some(Frame::pong(timestamp)),
                            Ok(Frame::Pong { .. }) => None,
                            Ok(frame) => {
                                warn!(connection = %connection_id, frame_type = ?frame.frame_type(), "Unexpected frame type");
                                None
                            }
                            Err(e) => Some(Frame::error(1002, e.to_string())),
                        };
                        if let Some(reply) = reply {
                            if send_frame(&mut sender, &reply, encoding).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(connection = %connection_id, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection_id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %connection_id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    debug!(connection = %connection_id, "WebSocket disconnected");
}

/// Send a frame to the WebSocket.
async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &Frame,
    encoding: Encoding,
) -> Result<()> {
    let message = match codec::encode(frame, encoding)? {
        Encoded::Text(text) => Message::Text(text),
        Encoded::Binary(data) => Message::Binary(data.to_vec()),
    };
    sender.send(message).await?;
    Ok(())
}
