//! Frontend wire protocol.
//!
//! Inbound messages are JSON objects carrying `cmd`, `result_id`, `error_id`
//! and `payload`. Some frontends double-encode: the text frame is a JSON
//! string whose content is the actual envelope, so one unwrapping pass is
//! tolerated. Anything else is rejected for the caller to log and ignore.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A command request from a frontend client.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEnvelope {
    pub cmd: String,
    pub result_id: i64,
    pub error_id: i64,
    pub payload: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a command envelope: {0}")]
    Shape(serde_json::Error),
}

/// Parse a frontend text message into an envelope.
pub fn parse_envelope(raw: &str) -> Result<CommandEnvelope, EnvelopeError> {
    let value: Value = serde_json::from_str(raw.trim())?;
    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner)?,
        other => other,
    };
    serde_json::from_value(value).map_err(EnvelopeError::Shape)
}
