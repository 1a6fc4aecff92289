pub mod config;
pub mod http;
pub mod ws;

pub use config::TransportConfig;
pub use http::HttpTransport;
pub use ws::{ConnectionEvent, WsTransport};

use parity_signer_core::{Transport, TransportError};

/// Picks the transport from the URL scheme.
pub async fn connect(config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    let scheme = config
        .url
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .unwrap_or_default();
    match scheme.as_str() {
        "http" | "https" => Ok(Box::new(HttpTransport::with_config(config)?)),
        "ws" | "wss" => Ok(Box::new(WsTransport::with_config(config).await?)),
        _ => Err(TransportError::Connection(format!(
            "unsupported rpc url scheme: {}",
            config.url
        ))),
    }
}
