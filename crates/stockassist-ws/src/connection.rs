//! Push connection manager.
//!
//! Handles connection lifecycle, automatic reconnection with exponential
//! backoff, the Socket.IO namespace handshake, and forwarding of decoded
//! chat events to the coordinator.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::{parse_frame, Frame, CONNECT_FRAME, DISCONNECT_FRAME, PONG_FRAME};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stockassist_core::PushEvent;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound on the exponent used for backoff doubling.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL (see `message::socket_url`).
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Ping interval assumed until the server handshake arrives.
    pub heartbeat_interval_ms: u64,
    /// Grace period after a missed ping before the connection is dropped.
    pub heartbeat_timeout_ms: u64,
    /// Session cookie sent with the upgrade request.
    pub cookie: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 5000,
            heartbeat_interval_ms: 25_000,
            heartbeat_timeout_ms: 20_000,
            cookie: None,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Push connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    heartbeat: Arc<HeartbeatManager>,
    event_tx: mpsc::Sender<PushEvent>,
    reconnect_count: Arc<RwLock<u32>>,
    /// Engine.IO session id of the current connection.
    session_id: Arc<RwLock<Option<String>>>,
    /// Set once the namespace handshake of a connection succeeds.
    session_established: AtomicBool,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<PushEvent>) -> Self {
        Self {
            heartbeat: Arc::new(HeartbeatManager::new(
                config.heartbeat_interval_ms,
                config.heartbeat_timeout_ms,
            )),
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            session_id: Arc::new(RwLock::new(None)),
            session_established: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Number of consecutive failed attempts since the last good session.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Engine.IO session id, if connected.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Signal graceful shutdown.
    ///
    /// Cancels the shutdown token, which will cause both the message loop
    /// and reconnect loop to exit promptly.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run the message loop until shutdown or until the
    /// reconnect budget is exhausted.
    pub async fn connect(&self) -> WsResult<()> {
        self.connect_with_retry().await
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            *self.state.write() = ConnectionState::Connecting;

            match self.try_connect().await {
                Ok(()) => {
                    info!("Push connection closed");
                }
                Err(e) => {
                    error!(?e, "Push connection error");
                }
            }
            *self.session_id.write() = None;

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            // A session that got through the handshake restarts the budget.
            if self.session_established.swap(false, Ordering::SeqCst) {
                attempt = 0;
            }
            attempt += 1;
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                *self.state.write() = ConnectionState::Disconnected;
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            *self.state.write() = ConnectionState::Reconnecting;

            let delay = with_jitter(backoff_delay(
                attempt,
                self.config.reconnect_base_delay_ms,
                self.config.reconnect_max_delay_ms,
            ));
            warn!(attempt, delay_ms = delay.as_millis(), "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting push channel");

        let mut request = self.config.url.as_str().into_client_request()?;
        if let Some(cookie) = &self.config.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| WsError::ConnectionFailed(format!("Invalid cookie: {e}")))?;
            request.headers_mut().insert(COOKIE, value);
        }

        let (ws_stream, _response) = connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Connected;
        self.heartbeat.reset();
        info!("Push channel connected");

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Text(DISCONNECT_FRAME.to_string())).await {
                        debug!(?e, "Failed to send namespace disconnect");
                    }
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = self.handle_text_frame(&text).await? {
                                write.send(Message::Text(reply.to_string())).await?;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.heartbeat.record_message();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Push channel closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Push channel read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Push channel stream ended");
                            return Ok(());
                        }
                        _ => {
                            self.heartbeat.record_message();
                        }
                    }
                }

                _ = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        error!(
                            silent_ms = self.heartbeat.time_since_last_message_ms(),
                            "Heartbeat timeout"
                        );
                        return Err(WsError::HeartbeatTimeout);
                    }
                }
            }
        }
    }

    /// Handle one text frame. Returns the frame to send back, if any.
    async fn handle_text_frame(&self, text: &str) -> WsResult<Option<&'static str>> {
        self.heartbeat.record_message();

        let frame = match parse_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                // A single malformed frame is not worth a reconnect.
                warn!(?e, frame = %text, "Dropping unparseable push frame");
                return Ok(None);
            }
        };

        match frame {
            Frame::Open(handshake) => {
                info!(sid = %handshake.sid, "Push session opened");
                self.heartbeat
                    .configure(handshake.ping_interval, handshake.ping_timeout);
                *self.session_id.write() = Some(handshake.sid);
                Ok(Some(CONNECT_FRAME))
            }
            Frame::Connected => {
                info!("Joined push namespace");
                self.session_established.store(true, Ordering::SeqCst);
                *self.reconnect_count.write() = 0;
                Ok(None)
            }
            Frame::Ping => {
                self.heartbeat.record_ping();
                Ok(Some(PONG_FRAME))
            }
            Frame::Pong | Frame::Ignored => Ok(None),
            Frame::Event { name, data } => {
                self.forward_event(&name, data).await;
                Ok(None)
            }
            Frame::Disconnected => {
                warn!("Server left the push namespace");
                Err(WsError::ConnectionClosed {
                    code: 1000,
                    reason: "namespace disconnect".to_string(),
                })
            }
            Frame::ConnectError(message) => Err(WsError::ConnectRejected(message)),
            Frame::Close => Err(WsError::ConnectionClosed {
                code: 1000,
                reason: "engine close".to_string(),
            }),
        }
    }

    async fn forward_event(&self, name: &str, data: serde_json::Value) {
        match PushEvent::from_parts(name, data) {
            Ok(Some(event)) => {
                debug!(
                    event = event.event_name(),
                    operation_id = %event.operation_id(),
                    "Push event received"
                );
                if self.event_tx.send(event).await.is_err() {
                    warn!("Push event receiver dropped");
                }
            }
            Ok(None) => {
                debug!(event = %name, "Ignoring push event");
            }
            Err(e) => {
                warn!(?e, event = %name, "Malformed push event payload");
            }
        }
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped at `max`.
///
/// attempt=1 -> base, attempt=2 -> 2*base, attempt=3 -> 4*base ...
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let delay = base_ms.saturating_mul(1u64 << exponent).min(max_ms);
    Duration::from_millis(delay)
}

/// Add up to 25% random jitter (at most one second).
fn with_jitter(delay: Duration) -> Duration {
    let span = (delay.as_millis() as u64 / 4).min(1000);
    if span == 0 {
        return delay;
    }
    let jitter = rand::rng().random_range(0..span);
    delay + Duration::from_millis(jitter)
}
