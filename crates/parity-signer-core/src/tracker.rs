//! Dapp side of the signer flow: post a transaction, wait for the signer to
//! settle it, then wait for the receipt.

use std::time::Duration;

use alloy::primitives::B256;
use serde_json::Value;

use crate::domain::{ConfirmationOutcome, RequestStatus, SignerRequestId};
use crate::ports::{SignerError, Transport, TransportError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

pub struct RequestTracker<T: Transport> {
    transport: T,
    poll_interval: Duration,
    max_attempts: Option<u32>,
}

impl<T: Transport> RequestTracker<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub async fn post_transaction(&self, tx: Value) -> Result<SignerRequestId, SignerError> {
        let result = self
            .transport
            .execute("parity_postTransaction", vec![tx])
            .await?;
        SignerRequestId::from_value(&result)
    }

    /// One `parity_checkRequest` round trip. `null` means the signer has not
    /// acted yet; the node reports a rejection as a `REQUEST_REJECTED` error.
    pub async fn check_request(&self, id: SignerRequestId) -> Result<RequestStatus, SignerError> {
        match self
            .transport
            .execute("parity_checkRequest", vec![id.to_param()])
            .await
        {
            Ok(Value::Null) => Ok(RequestStatus::Pending),
            Ok(value) => Ok(RequestStatus::Confirmed(ConfirmationOutcome::from_result(&value))),
            Err(TransportError::Rpc(err)) if err.is_request_rejected() => {
                Ok(RequestStatus::Rejected)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn wait_for_request(&self, id: SignerRequestId) -> Result<RequestStatus, SignerError> {
        let status = self
            .poll(|| async {
                let status = self.check_request(id).await?;
                Ok::<_, SignerError>(status.is_terminal().then_some(status))
            })
            .await?;
        tracing::info!(request = %id, ?status, "signer request settled");
        Ok(status)
    }

    pub async fn wait_for_receipt(&self, hash: B256) -> Result<Value, SignerError> {
        self.poll(|| async {
            let receipt = self
                .transport
                .execute("eth_getTransactionReceipt", vec![Value::String(hash.to_string())])
                .await?;
            Ok::<_, SignerError>((!receipt.is_null()).then_some(receipt))
        })
        .await
    }

    async fn poll<F, Fut, R>(&self, mut step: F) -> Result<R, SignerError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Option<R>, SignerError>>,
    {
        let mut attempts: u32 = 0;
        loop {
            if let Some(done) = step().await? {
                return Ok(done);
            }
            attempts = attempts.saturating_add(1);
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                let waited = self.poll_interval.saturating_mul(attempts);
                return Err(TransportError::Timeout(waited).into());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
