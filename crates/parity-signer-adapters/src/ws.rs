//! Multiplexed JSON-RPC over one persistent WebSocket.
//!
//! Responses may arrive in any order; each is routed to its caller through
//! the pending-call table keyed by request id. The transport does not
//! reconnect. When the socket goes away every pending call is rejected with
//! `TransportError::ConnectionClosed`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use parity_signer_core::{CallOptions, JsonRpcResponse, RequestEncoder, Transport, TransportError};

use crate::TransportConfig;

type Reply = oneshot::Sender<Result<Value, TransportError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Open,
    Closed,
    Error(String),
}

#[derive(Debug, Default)]
struct PendingTable {
    calls: HashMap<u64, Reply>,
    closed: bool,
}

#[derive(Debug)]
struct Connection {
    connected: AtomicBool,
    pending: Mutex<PendingTable>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl Connection {
    fn register(&self, id: u64, reply: Reply) -> Result<(), TransportError> {
        let mut g = self
            .pending
            .lock()
            .map_err(|e| TransportError::Connection(format!("pending table lock poisoned: {e}")))?;
        if g.closed {
            return Err(TransportError::ConnectionClosed);
        }
        g.calls.insert(id, reply);
        Ok(())
    }

    fn take(&self, id: u64) -> Option<Reply> {
        self.pending.lock().ok()?.calls.remove(&id)
    }

    fn pending_count(&self) -> usize {
        self.pending.lock().map(|g| g.calls.len()).unwrap_or_default()
    }

    fn dispatch(&self, text: &str) {
        let response = match JsonRpcResponse::decode(text) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed websocket frame");
                return;
            }
        };
        let Some(id) = response.id else {
            tracing::debug!(frame = text, "dropping websocket frame without id");
            return;
        };
        let Some(reply) = self.take(id) else {
            tracing::warn!(id, "dropping response with no pending call");
            return;
        };
        if reply.send(response.into_result()).is_err() {
            tracing::debug!(id, "caller stopped waiting for response");
        }
    }

    /// Runs once per connection, from whichever side notices the close first.
    fn shut_down(&self, event: Option<ConnectionEvent>) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        let drained: Vec<Reply> = match self.pending.lock() {
            Ok(mut g) => {
                g.closed = true;
                g.calls.drain().map(|(_, reply)| reply).collect()
            }
            Err(e) => {
                tracing::error!(error = %e, "pending table lock poisoned during shutdown");
                Vec::new()
            }
        };
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "rejecting calls pending at close");
        }
        for reply in drained {
            let _ = reply.send(Err(TransportError::ConnectionClosed));
        }
        if let Some(event) = event {
            let _ = self.events.send(event);
        }
        let _ = self.events.send(ConnectionEvent::Closed);
    }
}

/// Removes the pending entry if the call is dropped, times out or is aborted
/// before its response arrives.
struct PendingGuard<'a> {
    connection: &'a Connection,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.connection.take(self.id);
    }
}

#[derive(Debug)]
pub struct WsTransport {
    url: String,
    encoder: RequestEncoder,
    connection: Arc<Connection>,
    outbound: mpsc::UnboundedSender<Message>,
    default_timeout: Option<Duration>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsTransport {
    pub async fn connect(url: impl Into<String>) -> Result<Self, TransportError> {
        let url = url.into();
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connection(format!("websocket connect to {url} failed: {e}")))?;
        let (mut sink, mut source) = stream.split();
        let (events, _) = broadcast::channel(16);
        let connection = Arc::new(Connection {
            connected: AtomicBool::new(true),
            pending: Mutex::new(PendingTable::default()),
            events,
        });
        let (outbound, mut queue) = mpsc::unbounded_channel::<Message>();

        let writer_connection = Arc::clone(&connection);
        let writer = tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(error = %e, "websocket send failed");
                    writer_connection.shut_down(Some(ConnectionEvent::Error(e.to_string())));
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_connection = Arc::clone(&connection);
        let reader = tokio::spawn(async move {
            let mut failure = None;
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => reader_connection.dispatch(&text),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => reader_connection.dispatch(&text),
                        Err(e) => tracing::warn!(error = %e, "dropping non-utf8 websocket frame"),
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "websocket closed by peer");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "websocket read failed");
                        failure = Some(ConnectionEvent::Error(e.to_string()));
                        break;
                    }
                }
            }
            reader_connection.shut_down(failure);
        });

        tracing::info!(%url, "websocket connected");
        let _ = connection.events.send(ConnectionEvent::Open);
        Ok(Self {
            url,
            encoder: RequestEncoder::new(),
            connection,
            outbound,
            default_timeout: None,
            reader,
            writer,
        })
    }

    pub async fn with_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut transport = Self::connect(config.url.clone()).await?;
        transport.default_timeout = config.request_timeout();
        transport.encoder.set_debug(config.debug);
        Ok(transport)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.connection.connected.load(Ordering::SeqCst)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection.events.subscribe()
    }

    /// Number of calls still waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.connection.pending_count()
    }

    pub fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
        self.connection.shut_down(None);
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn execute_with(
        &self,
        method: &str,
        params: Vec<Value>,
        options: CallOptions,
    ) -> Result<Value, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::ConnectionClosed);
        }
        let request = self.encoder.encode(method, params)?;
        let (reply, response) = oneshot::channel();
        self.connection.register(request.id, reply)?;
        let _guard = PendingGuard {
            connection: &self.connection,
            id: request.id,
        };
        self.outbound
            .send(Message::Text(request.body))
            .map_err(|_| TransportError::ConnectionClosed)?;

        let result = options
            .or_default_timeout(self.default_timeout)
            .run(async move {
                response
                    .await
                    .unwrap_or(Err(TransportError::ConnectionClosed))
            })
            .await;
        if let Err(err) = &result {
            self.encoder.error(&format!("{method}: {err}"));
        }
        result
    }

    fn encoder(&self) -> &RequestEncoder {
        &self.encoder
    }
}
