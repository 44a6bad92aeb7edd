//! Mock Socket.IO server for push channel tests.
//!
//! Speaks just enough Engine.IO v4 to exercise the client:
//! - Sends the open handshake on connect
//! - Acknowledges the namespace join
//! - Emits scripted events once the client has joined
//! - Records every text frame the client sends
//! - Records the Cookie header of every upgrade request

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

/// Server behaviour after the scripted events are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterScript {
    /// Keep the socket open.
    Stay,
    /// Close the socket, forcing the client to reconnect.
    Drop,
}

pub struct MockSocketIoServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    cookies: Arc<parking_lot::Mutex<Vec<Option<String>>>>,
}

impl MockSocketIoServer {
    /// Start a server on an ephemeral port that emits `frames` to every
    /// client after it joins the namespace.
    pub async fn start(frames: Vec<String>, after: AfterScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(0u32));
        let cookies = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let received_clone = received.clone();
        let connections_clone = connections.clone();
        let cookies_clone = cookies.clone();
        let frames = Arc::new(frames);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            frames.clone(),
                            after,
                            received_clone.clone(),
                            connections_clone.clone(),
                            cookies_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            received,
            connections,
            cookies,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/socket.io/?EIO=4&transport=websocket", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    pub async fn received_frames(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    /// Cookie header of each upgrade request, in connection order.
    pub fn cookies(&self) -> Vec<Option<String>> {
        self.cookies.lock().clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    frames: Arc<Vec<String>>,
    after: AfterScript,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    cookies: Arc<parking_lot::Mutex<Vec<Option<String>>>>,
) {
    let record_cookie =
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let cookie = request
                .headers()
                .get(COOKIE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            cookies.lock().push(cookie);
            Ok(response)
        };
    let ws_stream = match accept_hdr_async(stream, record_cookie).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    {
        *connections.lock().await += 1;
    }

    let (mut write, mut read) = ws_stream.split();
    let open = r#"0{"sid":"mock-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
    if write.send(Message::Text(open.to_string())).await.is_err() {
        return;
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                received.lock().await.push(text.clone());
                if text == "40" {
                    let _ = write
                        .send(Message::Text(r#"40{"sid":"ns-sid"}"#.to_string()))
                        .await;
                    // Exercise the ping path before the script.
                    let _ = write.send(Message::Text("2".to_string())).await;
                    for frame in frames.iter() {
                        let _ = write.send(Message::Text(frame.clone())).await;
                    }
                    if after == AfterScript::Drop {
                        let _ = write.send(Message::Close(None)).await;
                        return;
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
}
