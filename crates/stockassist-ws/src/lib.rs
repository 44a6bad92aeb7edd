//! Push-notification client for StockAssist chat operations.
//!
//! Keeps a standing Socket.IO (Engine.IO v4) connection to the server and
//! forwards `chat_completed` / `chat_error` events to the coordinator:
//! - Automatic reconnection with capped exponential backoff and jitter
//! - Server-driven heartbeat (ping/pong) with timeout detection
//! - Frame decoding for Socket.IO packets and plain JSON envelopes

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;

pub use connection::{backoff_delay, ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use message::{parse_frame, socket_url, Frame, Handshake};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any TLS connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
