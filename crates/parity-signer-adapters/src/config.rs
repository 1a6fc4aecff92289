use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    pub request_timeout_ms: Option<u64>,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    pub debug: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_owned(),
            request_timeout_ms: None,
            poll_interval_ms: 1_000,
            max_poll_attempts: None,
            debug: false,
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("PARITY_SIGNER_RPC_URL").unwrap_or(defaults.url),
            request_timeout_ms: env_parse("PARITY_SIGNER_TIMEOUT_MS").or(defaults.request_timeout_ms),
            poll_interval_ms: env_parse("PARITY_SIGNER_POLL_INTERVAL_MS")
                .unwrap_or(defaults.poll_interval_ms),
            max_poll_attempts: env_parse("PARITY_SIGNER_MAX_POLLS").or(defaults.max_poll_attempts),
            debug: env_flag("PARITY_SIGNER_DEBUG").unwrap_or(defaults.debug),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable config value");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring unparsable config flag");
            None
        }
    }
}
