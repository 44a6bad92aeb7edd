//! Heartbeat management for the push connection.
//!
//! Engine.IO heartbeats are server driven: the server sends a ping every
//! `pingInterval` and expects a pong within `pingTimeout`. The client
//! considers the connection dead when nothing at all has arrived for
//! `pingInterval + pingTimeout`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Heartbeat manager for push connection health.
pub struct HeartbeatManager {
    /// Expected server ping interval (ms).
    interval_ms: Arc<RwLock<u64>>,
    /// Grace period on top of the interval (ms).
    timeout_ms: Arc<RwLock<u64>>,
    /// Last server ping received.
    last_ping: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Last frame received (any frame).
    last_message: Arc<RwLock<DateTime<Utc>>>,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms: Arc::new(RwLock::new(interval_ms)),
            timeout_ms: Arc::new(RwLock::new(timeout_ms)),
            last_ping: Arc::new(RwLock::new(None)),
            last_message: Arc::new(RwLock::new(Utc::now())),
        }
    }

    /// Adopt the timing announced in the server handshake.
    pub fn configure(&self, interval_ms: u64, timeout_ms: u64) {
        *self.interval_ms.write() = interval_ms;
        *self.timeout_ms.write() = timeout_ms;
        debug!(interval_ms, timeout_ms, "Heartbeat configured from handshake");
    }

    /// Reset heartbeat state (called on connection).
    pub fn reset(&self) {
        *self.last_ping.write() = None;
        *self.last_message.write() = Utc::now();
    }

    /// Record that the server pinged us.
    pub fn record_ping(&self) {
        let now = Utc::now();
        if let Some(previous) = *self.last_ping.read() {
            debug!(gap_ms = (now - previous).num_milliseconds(), "Server ping");
        }
        *self.last_ping.write() = Some(now);
        *self.last_message.write() = now;
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    /// Get time since last frame.
    pub fn time_since_last_message_ms(&self) -> i64 {
        (Utc::now() - *self.last_message.read()).num_milliseconds()
    }

    /// Check if the server has gone silent for longer than allowed.
    pub fn is_timed_out(&self) -> bool {
        let budget = *self.interval_ms.read() + *self.timeout_ms.read();
        self.time_since_last_message_ms() > budget as i64
    }

    /// Wait for the next heartbeat check.
    pub async fn wait_for_check(&self) {
        let interval = *self.interval_ms.read();
        tokio::time::sleep(Duration::from_millis((interval / 2).max(10))).await;
    }

    /// Get heartbeat statistics.
    pub fn stats(&self) -> HeartbeatStats {
        let last_ping = *self.last_ping.read();
        let last_message = *self.last_message.read();
        HeartbeatStats {
            last_ping,
            last_message,
            time_since_last_message_ms: (Utc::now() - last_message).num_milliseconds(),
        }
    }
}

/// Heartbeat statistics.
#[derive(Debug, Clone)]
pub struct HeartbeatStats {
    pub last_ping: Option<DateTime<Utc>>,
    pub last_message: DateTime<Utc>,
    pub time_since_last_message_ms: i64,
}
