//! Minimal push server for application tests.
//!
//! Completes the Engine.IO handshake, then emits whatever frames the test
//! hands it through [`PushServer::emit`]. The Cookie header of the last
//! upgrade request is kept for [`PushServer::cookie`].

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

const OPEN_FRAME: &str =
    r#"0{"sid":"app-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

pub struct PushServer {
    addr: SocketAddr,
    emit_tx: mpsc::Sender<String>,
    received: Arc<Mutex<Vec<String>>>,
    cookie: Arc<parking_lot::Mutex<Option<String>>>,
}

impl PushServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (emit_tx, emit_rx) = mpsc::channel::<String>(16);
        let emit_rx = Arc::new(Mutex::new(emit_rx));
        let received = Arc::new(Mutex::new(Vec::new()));
        let cookie = Arc::new(parking_lot::Mutex::new(None));

        let received_clone = received.clone();
        let cookie_clone = cookie.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let emit_rx = emit_rx.clone();
                let received = received_clone.clone();
                let cookie = cookie_clone.clone();
                tokio::spawn(async move {
                    let record_cookie =
                        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                            *cookie.lock() = request
                                .headers()
                                .get(COOKIE)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            Ok(response)
                        };
                    let Ok(ws) = accept_hdr_async(stream, record_cookie).await else {
                        return;
                    };
                    let (mut write, mut read) = ws.split();
                    if write.send(Message::Text(OPEN_FRAME.to_string())).await.is_err() {
                        return;
                    }

                    let mut emit_rx = emit_rx.lock().await;
                    loop {
                        tokio::select! {
                            incoming = read.next() => match incoming {
                                Some(Ok(Message::Text(text))) => {
                                    let reply = (text == "40").then(|| r#"40{"sid":"ns-sid"}"#);
                                    received.lock().await.push(text);
                                    if let Some(reply) = reply {
                                        if write.send(Message::Text(reply.to_string())).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            },
                            frame = emit_rx.recv() => match frame {
                                Some(frame) => {
                                    if write.send(Message::Text(frame)).await.is_err() {
                                        break;
                                    }
                                }
                                None => break,
                            },
                        }
                    }
                });
            }
        });

        Self {
            addr,
            emit_tx,
            received,
            cookie,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/socket.io/?EIO=4&transport=websocket", self.addr)
    }

    /// Wait until the client has joined the default namespace.
    pub async fn wait_for_join(&self) {
        for _ in 0..100 {
            if self.received.lock().await.iter().any(|f| f == "40") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("client never joined the namespace");
    }

    pub fn cookie(&self) -> Option<String> {
        self.cookie.lock().clone()
    }

    pub async fn emit(&self, frame: &str) {
        self.emit_tx.send(frame.to_string()).await.unwrap();
    }
}
