#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tiny_http::{Response, Server, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Canned {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Answers each POST with the next canned response, in order.
pub fn spawn_http_server(replies: Vec<Canned>) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&recorded);

    thread::spawn(move || {
        for canned in replies {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut body = String::new();
            let _ = req.as_reader().read_to_string(&mut body);
            let headers = req
                .headers()
                .iter()
                .map(|h| (h.field.to_string(), h.value.to_string()))
                .collect();
            if let Ok(mut g) = log.lock() {
                g.push(Recorded {
                    method: req.method().to_string(),
                    headers,
                    body,
                });
            }
            thread::sleep(canned.delay);
            let response =
                Response::from_string(canned.body).with_status_code(StatusCode(canned.status));
            let _ = req.respond(response);
        }
    });

    (addr, recorded)
}

enum PeerCommand {
    Send(Message),
    /// Drops the TCP stream without a closing handshake.
    Sever,
}

/// Server side of a single WebSocket connection, driven by the test.
pub struct WsPeer {
    pub url: String,
    incoming: mpsc::UnboundedReceiver<Value>,
    outgoing: mpsc::UnboundedSender<PeerCommand>,
}

impl WsPeer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, mut commands) = mpsc::unbounded_channel::<PeerCommand>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("accept");
            let mut socket = accept_async(tcp).await.expect("handshake");
            loop {
                tokio::select! {
                    command = commands.recv() => match command {
                        Some(PeerCommand::Send(message)) => {
                            if socket.send(message).await.is_err() {
                                break;
                            }
                        }
                        Some(PeerCommand::Sever) | None => break,
                    },
                    frame = socket.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let request = serde_json::from_str(&text).expect("request json");
                            if incoming_tx.send(request).is_err() {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    },
                }
            }
        });

        Self {
            url,
            incoming,
            outgoing,
        }
    }

    pub async fn recv(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(5), self.incoming.recv())
            .await
            .expect("request in time")
            .expect("peer open")
    }

    pub fn send_raw(&self, text: String) {
        let _ = self.outgoing.send(PeerCommand::Send(Message::Text(text)));
    }

    pub fn reply(&self, request: &Value, result: Value) {
        self.send_raw(json!({"jsonrpc": "2.0", "id": request["id"], "result": result}).to_string());
    }

    pub fn reply_error(&self, request: &Value, code: i64, message: &str) {
        self.send_raw(
            json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": code, "message": message}
            })
            .to_string(),
        );
    }

    pub fn close(&self) {
        let _ = self.outgoing.send(PeerCommand::Send(Message::Close(None)));
    }

    pub fn sever(&self) {
        let _ = self.outgoing.send(PeerCommand::Sever);
    }
}
