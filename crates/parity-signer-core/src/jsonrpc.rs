//! JSON-RPC 2.0 envelopes and per-transport id bookkeeping.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ports::TransportError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Node error codes surfaced by the signer and account APIs.
pub const PASSWORD_INVALID: i64 = -32021;
pub const REQUEST_REJECTED: i64 = -32040;
pub const REQUEST_REJECTED_LIMIT: i64 = -32041;
pub const REQUEST_NOT_FOUND: i64 = -32042;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

/// Error object returned by the node in place of a result.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_request_rejected(&self) -> bool {
        self.code == REQUEST_REJECTED
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Result(Value),
    Error(RpcError),
}

/// A decoded response frame. `id` is absent for notifications and for
/// responses from nodes that echo a non-numeric id.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub id: Option<u64>,
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| TransportError::Decode(format!("invalid json-rpc response: {e}")))?;
        Self::from_value(value)
    }

    /// An `error` member that is present and non-null wins; otherwise the
    /// `result` member is taken, with a missing one read as `null`.
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        let Value::Object(mut body) = value else {
            return Err(TransportError::Decode(
                "json-rpc response must be an object".to_owned(),
            ));
        };
        let id = body.get("id").and_then(Value::as_u64);
        let outcome = match body.remove("error") {
            Some(err) if !err.is_null() => {
                let err: RpcError = serde_json::from_value(err)
                    .map_err(|e| TransportError::Decode(format!("invalid error object: {e}")))?;
                ResponseOutcome::Error(err)
            }
            _ => ResponseOutcome::Result(body.remove("result").unwrap_or(Value::Null)),
        };
        Ok(Self { id, outcome })
    }

    pub fn into_result(self) -> Result<Value, TransportError> {
        match self.outcome {
            ResponseOutcome::Result(value) => Ok(value),
            ResponseOutcome::Error(err) => Err(TransportError::Rpc(err)),
        }
    }
}

/// A serialized request together with the id it was emitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    pub id: u64,
    pub body: String,
}

/// Owns the id counter of one transport instance. Ids start at 1 and are
/// never reused by the same encoder.
#[derive(Debug)]
pub struct RequestEncoder {
    next_id: AtomicU64,
    first_id: u64,
    debug: AtomicBool,
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
            first_id,
            debug: AtomicBool::new(false),
        }
    }

    pub fn encode(&self, method: &str, params: Vec<Value>) -> Result<EncodedRequest, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.to_owned(),
            params,
            id,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| TransportError::Encode(format!("{method}: {e}")))?;
        self.log(&body);
        Ok(EncodedRequest { id, body })
    }

    /// Id the next `encode` call will use.
    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Id of the most recent `encode` call, if any.
    pub fn last_id(&self) -> Option<u64> {
        let next = self.next_id();
        (next > self.first_id).then(|| next - 1)
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn log(&self, message: &str) {
        if self.is_debug() {
            tracing::debug!(target: "jsonrpc", "{message}");
        }
    }

    pub fn error(&self, message: &str) {
        if self.is_debug() {
            tracing::error!(target: "jsonrpc", "{message}");
        }
    }
}
