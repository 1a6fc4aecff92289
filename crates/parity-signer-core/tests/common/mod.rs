#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use parity_signer_core::{CallOptions, RequestEncoder, RpcError, Transport, TransportError};

/// Replays queued replies in order and records every call it receives.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    encoder: RequestEncoder,
    replies: Mutex<VecDeque<(Result<Value, TransportError>, Option<Arc<Notify>>)>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, value: Value) -> &Self {
        self.replies.lock().expect("replies lock").push_back((Ok(value), None));
        self
    }

    /// Queues a reply that is held back until `gate` is notified.
    pub fn reply_after(&self, value: Value, gate: Arc<Notify>) -> &Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back((Ok(value), Some(gate)));
        self
    }

    pub fn fail(&self, err: TransportError) -> &Self {
        self.replies.lock().expect("replies lock").push_back((Err(err), None));
        self
    }

    pub fn rpc_error(&self, code: i64, message: &str) -> &Self {
        self.fail(TransportError::Rpc(RpcError::new(code, message)))
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(method, _)| method).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute_with(
        &self,
        method: &str,
        params: Vec<Value>,
        options: CallOptions,
    ) -> Result<Value, TransportError> {
        self.encoder.encode(method, params.clone())?;
        self.calls
            .lock()
            .expect("calls lock")
            .push((method.to_owned(), params));
        let (reply, gate) = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| {
                let err = TransportError::Connection(format!("no scripted reply for {method}"));
                (Err(err), None)
            });
        options
            .run(async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                reply
            })
            .await
    }

    fn encoder(&self) -> &RequestEncoder {
        &self.encoder
    }
}

pub const TX_HASH: &str = "0xde8dfd9642f7eeef12402f2a560dbf40921b4f0bda01fb84709b9d71f6c181be";

pub fn send_transaction_request(id: &str) -> Value {
    json!({
        "id": id,
        "origin": {"dapp": "http://parity.io"},
        "payload": {
            "sendTransaction": {
                "condition": null,
                "data": "0x",
                "from": "0x0000000000000000000000000000000000000001",
                "gas": "0x989680",
                "gasPrice": "0x2710",
                "nonce": null,
                "to": "0xd46e8dd67c5d32be8058bb8eb970870f07244567",
                "value": "0x1"
            }
        }
    })
}

pub fn sign_request(id: &str) -> Value {
    json!({
        "id": id,
        "origin": "unknown",
        "payload": {
            "sign": {
                "address": "0x0000000000000000000000000000000000000001",
                "data": "0x05"
            }
        }
    })
}
