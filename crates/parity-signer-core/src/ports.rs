use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{AbortRegistration, Abortable};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::domain::SignerRequestId;
use crate::jsonrpc::{RequestEncoder, RpcError};
use crate::state_machine::RequestState;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{status}: {status_text}")]
    Http { status: u16, status_text: String },
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("connection closed before the call resolved")]
    ConnectionClosed,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("call cancelled")]
    Cancelled,
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn rpc(&self) -> Option<&RpcError> {
        match self {
            Self::Rpc(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SignerError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("illegal signer transition: {from:?} -> {action}")]
    IllegalTransition {
        from: RequestState,
        action: &'static str,
    },
    #[error("signer request not found: {0}")]
    NotFound(SignerRequestId),
    #[error("signer request already {state:?}: {id}")]
    AlreadyTerminal {
        id: SignerRequestId,
        state: RequestState,
    },
    #[error("node refused to reject signer request {0}")]
    RejectRefused(SignerRequestId),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("signer state lock poisoned: {0}")]
    Lock(String),
}

/// Per-call deadline and cancellation. Dropping the future returned by
/// `execute_with` cancels the call as well.
#[derive(Debug, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub abort: Option<AbortRegistration>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            abort: None,
        }
    }

    pub fn abortable(mut self, registration: AbortRegistration) -> Self {
        self.abort = Some(registration);
        self
    }

    pub fn or_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        if self.timeout.is_none() {
            self.timeout = timeout;
        }
        self
    }

    pub async fn run<F, T>(self, call: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let Self { timeout, abort } = self;
        let bounded = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or(Err(TransportError::Timeout(limit))),
                None => call.await,
            }
        };
        match abort {
            Some(registration) => Abortable::new(bounded, registration)
                .await
                .unwrap_or(Err(TransportError::Cancelled)),
            None => bounded.await,
        }
    }
}

/// The single entry point every higher-level API wrapper calls through.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute_with(
        &self,
        method: &str,
        params: Vec<Value>,
        options: CallOptions,
    ) -> Result<Value, TransportError>;

    async fn execute(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        self.execute_with(method, params, CallOptions::default())
            .await
    }

    fn encoder(&self) -> &RequestEncoder;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute_with(
        &self,
        method: &str,
        params: Vec<Value>,
        options: CallOptions,
    ) -> Result<Value, TransportError> {
        (**self).execute_with(method, params, options).await
    }

    fn encoder(&self) -> &RequestEncoder {
        (**self).encoder()
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute_with(
        &self,
        method: &str,
        params: Vec<Value>,
        options: CallOptions,
    ) -> Result<Value, TransportError> {
        (**self).execute_with(method, params, options).await
    }

    fn encoder(&self) -> &RequestEncoder {
        (**self).encoder()
    }
}

pub async fn execute_typed<T, R>(
    transport: &R,
    method: &str,
    params: Vec<Value>,
) -> Result<T, TransportError>
where
    T: DeserializeOwned,
    R: Transport + ?Sized,
{
    let value = transport.execute(method, params).await?;
    serde_json::from_value(value)
        .map_err(|e| TransportError::Decode(format!("{method} result: {e}")))
}
