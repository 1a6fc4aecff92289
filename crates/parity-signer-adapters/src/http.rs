use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use parity_signer_core::{CallOptions, JsonRpcResponse, RequestEncoder, Transport, TransportError};

use crate::TransportConfig;

/// One POST per call. Request and response are paired by the exchange
/// itself, so no correlation state is kept.
#[derive(Debug)]
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    encoder: RequestEncoder,
    default_timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Connection(format!("failed to build http client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
            encoder: RequestEncoder::new(),
            default_timeout: None,
        })
    }

    pub fn with_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut transport = Self::new(config.url.clone())?;
        transport.default_timeout = config.request_timeout();
        transport.encoder.set_debug(config.debug);
        Ok(transport)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let request = self.encoder.encode(method, params)?;
        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, request.body.len())
            .body(request.body)
            .send()
            .await
            .map_err(|e| TransportError::Connection(format!("http request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let err = TransportError::Http {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .map(str::to_owned)
                    .unwrap_or_else(|| status.as_str().to_owned()),
            };
            self.encoder.error(&format!("{method}: {err}"));
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(format!("http body read failed: {e}")))?;
        let result = JsonRpcResponse::decode(&body)?.into_result();
        if let Err(err) = &result {
            self.encoder.error(&format!("{method}: {err}"));
        }
        result
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute_with(
        &self,
        method: &str,
        params: Vec<Value>,
        options: CallOptions,
    ) -> Result<Value, TransportError> {
        options
            .or_default_timeout(self.default_timeout)
            .run(self.send(method, params))
            .await
    }

    fn encoder(&self) -> &RequestEncoder {
        &self.encoder
    }
}
