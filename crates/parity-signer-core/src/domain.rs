use std::fmt;

use alloy::primitives::{Address, Bytes, B256};
use serde_json::Value;

use crate::ports::SignerError;

/// Signer queue id assigned by the node. Unrelated to JSON-RPC request ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignerRequestId(pub u64);

impl SignerRequestId {
    pub fn from_value(value: &Value) -> Result<Self, SignerError> {
        parse_quantity(value)
            .map(Self)
            .ok_or_else(|| SignerError::Decode(format!("invalid signer request id: {value}")))
    }

    pub fn to_param(self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Display for SignerRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for SignerRequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationPayload {
    SendTransaction(Value),
    SignTransaction(Value),
    EthSignMessage { address: Address, data: Bytes },
    Decrypt { address: Address, msg: Bytes },
    Other(Value),
}

impl ConfirmationPayload {
    pub fn from_value(value: &Value) -> Result<Self, SignerError> {
        if let Some(tx) = value.get("sendTransaction") {
            return Ok(Self::SendTransaction(tx.clone()));
        }
        if let Some(tx) = value.get("signTransaction") {
            return Ok(Self::SignTransaction(tx.clone()));
        }
        if let Some(sign) = value.get("sign") {
            return Ok(Self::EthSignMessage {
                address: parse_field(sign, "address")?,
                data: parse_field(sign, "data")?,
            });
        }
        if let Some(decrypt) = value.get("decrypt") {
            return Ok(Self::Decrypt {
                address: parse_field(decrypt, "address")?,
                msg: parse_field(decrypt, "msg")?,
            });
        }
        Ok(Self::Other(value.clone()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendTransaction(_) => "sendTransaction",
            Self::SignTransaction(_) => "signTransaction",
            Self::EthSignMessage { .. } => "sign",
            Self::Decrypt { .. } => "decrypt",
            Self::Other(_) => "other",
        }
    }
}

/// What a successful confirmation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    TransactionHash(B256),
    Signature(Bytes),
    Other(Value),
}

impl ConfirmationOutcome {
    pub fn from_result(value: &Value) -> Self {
        if let Some(raw) = value.as_str() {
            if let Ok(hash) = raw.parse::<B256>() {
                return Self::TransactionHash(hash);
            }
            if let Ok(bytes) = raw.parse::<Bytes>() {
                return Self::Signature(bytes);
            }
        }
        Self::Other(value.clone())
    }

    pub fn transaction_hash(&self) -> Option<B256> {
        match self {
            Self::TransactionHash(hash) => Some(*hash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestStatus {
    Pending,
    Confirmed(ConfirmationOutcome),
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn outcome(&self) -> Option<&ConfirmationOutcome> {
        match self {
            Self::Confirmed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignerRequest {
    pub id: SignerRequestId,
    pub origin: Value,
    pub payload: ConfirmationPayload,
    pub status: RequestStatus,
}

impl SignerRequest {
    /// Parses one entry of `signer_requestsToConfirm`.
    pub fn from_value(value: &Value) -> Result<Self, SignerError> {
        let id = value
            .get("id")
            .ok_or_else(|| SignerError::Decode("signer request missing id".to_owned()))?;
        let payload = value
            .get("payload")
            .ok_or_else(|| SignerError::Decode("signer request missing payload".to_owned()))?;
        Ok(Self {
            id: SignerRequestId::from_value(id)?,
            origin: value.get("origin").cloned().unwrap_or(Value::Null),
            payload: ConfirmationPayload::from_value(payload)?,
            status: RequestStatus::Pending,
        })
    }
}

/// Reads a JSON quantity given either as a `0x` hex string or a number.
pub fn parse_quantity(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

fn parse_field<T>(value: &Value, field: &str) -> Result<T, SignerError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let raw = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SignerError::Decode(format!("missing {field}")))?;
    raw.parse()
        .map_err(|e| SignerError::Decode(format!("invalid {field}: {e}")))
}
