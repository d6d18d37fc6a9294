//! Response envelope parsing and status classification.
//!
//! # Design
//! Phaxio answers every structured call with
//! `{"success", "message", "data"?, "paging"?}`. Classification looks at the
//! status first (401, 404, 422, 429), then treats any 5xx or an envelope that
//! reports `success: false` as a general failure. Everything else becomes an
//! `OperationResult`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::PhaxioError;

/// The JSON envelope as received. Every field is optional so that error
/// bodies with missing keys still classify by status.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub paging: Option<Value>,
}

/// A successful structured response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    /// Object or list, depending on the endpoint.
    pub data: Option<Value>,
    pub paging: Option<Value>,
}

impl OperationResult {
    /// Decode `data` into a caller-defined type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, PhaxioError> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| PhaxioError::General("response contained no data".to_string()))?;
        serde_json::from_value(data)
            .map_err(|e| PhaxioError::General(format!("unexpected response data: {e}")))
    }
}

/// Parse a response body as an envelope. A body that is not a JSON object of
/// the expected shape is a general failure.
pub fn parse_envelope(status: u16, body: &[u8]) -> Result<Envelope, PhaxioError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(status, error = %e, "response body is not a valid envelope");
        PhaxioError::General(format!(
            "unable to parse response body (HTTP {status})"
        ))
    })
}

/// Map a status code and parsed envelope to a result or an error.
pub fn classify(status: u16, envelope: Envelope) -> Result<OperationResult, PhaxioError> {
    let failed = envelope.success == Some(false);
    let message = envelope.message.unwrap_or_default();

    let error = match status {
        401 => PhaxioError::Authentication(message),
        404 => PhaxioError::NotFound(message),
        422 => PhaxioError::InvalidRequest(message),
        429 => PhaxioError::RateLimited(message),
        s if s >= 500 || failed => PhaxioError::General(message),
        _ => {
            return Ok(OperationResult {
                success: envelope.success.unwrap_or(true),
                message,
                data: envelope.data,
                paging: envelope.paging,
            })
        }
    };

    warn!(status, kind = ?error.kind(), reason = error.message(), "request failed");
    Err(error)
}
