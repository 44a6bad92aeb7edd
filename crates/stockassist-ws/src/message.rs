//! Push channel frame types.
//!
//! The server speaks Socket.IO v4 on top of Engine.IO v4. Each WebSocket
//! text frame starts with an Engine.IO packet type digit; `4` (message)
//! frames carry a Socket.IO packet whose first digit is the Socket.IO
//! packet type:
//!
//! | Frame            | Meaning                                   |
//! |------------------|-------------------------------------------|
//! | `0{...}`         | open, carries the session handshake       |
//! | `1`              | transport close                           |
//! | `2` / `3`        | ping / pong                               |
//! | `40` / `40{...}` | namespace connect (request / ack)         |
//! | `41`             | namespace disconnect                      |
//! | `42["ev", data]` | event, optionally `42/ns,<ack>[...]`      |
//! | `44{...}`        | namespace connect error                   |
//!
//! A plain JSON envelope `{"event": "...", "data": {...}}` is accepted too.

use crate::error::{WsError, WsResult};
use serde::Deserialize;
use url::Url;

/// Pong reply to a server ping.
pub const PONG_FRAME: &str = "3";
/// Join the default namespace.
pub const CONNECT_FRAME: &str = "40";
/// Leave the default namespace.
pub const DISCONNECT_FRAME: &str = "41";

/// Engine.IO open handshake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    /// Server ping interval (ms).
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// How long the server waits for a pong (ms).
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

/// Decoded push channel frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Connected,
    Disconnected,
    ConnectError(String),
    Event {
        name: String,
        data: serde_json::Value,
    },
    /// Anything this client ignores (acks, upgrades, noop).
    Ignored,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse one WebSocket text frame.
pub fn parse_frame(text: &str) -> WsResult<Frame> {
    let text = text.trim();
    if text.starts_with('{') {
        let envelope: Envelope = serde_json::from_str(text)?;
        return Ok(Frame::Event {
            name: envelope.event,
            data: envelope.data,
        });
    }

    let mut chars = text.chars();
    let Some(engine_type) = chars.next() else {
        return Err(WsError::ParseError("empty frame".to_string()));
    };
    let rest = chars.as_str();

    match engine_type {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => parse_socket_packet(rest),
        '5' | '6' => Ok(Frame::Ignored),
        other => Err(WsError::ParseError(format!(
            "unknown engine packet type '{other}'"
        ))),
    }
}

fn parse_socket_packet(packet: &str) -> WsResult<Frame> {
    let mut chars = packet.chars();
    let Some(socket_type) = chars.next() else {
        return Err(WsError::ParseError("empty socket packet".to_string()));
    };
    let body = strip_namespace(chars.as_str());

    match socket_type {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => parse_event(body),
        '4' => {
            let message = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| body.to_string());
            Ok(Frame::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Frame::Ignored),
        other => Err(WsError::ParseError(format!(
            "unknown socket packet type '{other}'"
        ))),
    }
}

/// Drop a leading `/namespace,` segment if present.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn parse_event(body: &str) -> WsResult<Frame> {
    // Optional ack id precedes the payload array.
    let payload = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let values: Vec<serde_json::Value> = serde_json::from_str(payload)?;
    let mut values = values.into_iter();

    let name = match values.next() {
        Some(serde_json::Value::String(name)) => name,
        _ => return Err(WsError::ParseError("event without name".to_string())),
    };
    let data = values.next().unwrap_or(serde_json::Value::Null);

    Ok(Frame::Event { name, data })
}

/// Build the push channel URL from the application base URL.
///
/// `https://host` becomes `wss://host/socket.io/?EIO=4&transport=websocket`.
/// URLs that already use `ws`/`wss` keep their path.
pub fn socket_url(base_url: &str) -> WsResult<String> {
    let mut url = Url::parse(base_url).map_err(|e| WsError::InvalidUrl(format!("{base_url}: {e}")))?;

    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(url.to_string()),
        other => return Err(WsError::InvalidUrl(format!("unsupported scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| WsError::InvalidUrl(format!("cannot switch {base_url} to {scheme}")))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));

    Ok(url.to_string())
}
