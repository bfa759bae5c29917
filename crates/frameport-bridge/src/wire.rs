//! Wire format of the native-runtime transport.
//!
//! Every message is a 4-byte big-endian length prefix followed by a UTF-8
//! JSON body. Requests are positional arrays `[id, method, args]`; responses
//! are `[id, code, msg, result]` where `code == 0` means success.

use serde_json::Value;
use tokio_util::codec::LengthDelimitedCodec;

use crate::error::CallError;
use crate::CallResult;

/// Upper bound on a single frame body; larger frames are transport faults.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Codec for the runtime framing: 4-byte big-endian length, then the body.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

/// Request sent to the native runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub id: u16,
    pub method: String,
    pub args: Vec<Value>,
}

impl ApiRequest {
    pub fn new(id: u16, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            args,
        }
    }

    /// Positional array form, `[id, method, args]`.
    pub fn to_array(&self) -> Value {
        serde_json::json!([self.id, self.method, self.args])
    }

    /// JSON body bytes, ready for framing.
    pub fn encode_body(&self) -> Result<Vec<u8>, CallError> {
        serde_json::to_vec(&self.to_array())
            .map_err(|e| CallError::Protocol(format!("encoding request: {e}")))
    }
}

/// Response returned by the native runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub id: u16,
    pub code: i64,
    pub message: String,
    pub result: Value,
}

impl ApiResponse {
    /// Parse the positional array form, `[id, code, msg, result]`.
    pub fn from_array(value: &Value) -> Result<Self, CallError> {
        let arr = match value.as_array() {
            Some(arr) if arr.len() == 4 => arr,
            _ => {
                return Err(CallError::Protocol(format!(
                    "invalid response array: {value}"
                )))
            }
        };
        let id = arr[0]
            .as_u64()
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(|| CallError::Protocol(format!("invalid response id: {}", arr[0])))?;
        let code = arr[1]
            .as_i64()
            .ok_or_else(|| CallError::Protocol(format!("invalid response code: {}", arr[1])))?;
        let message = arr[2]
            .as_str()
            .ok_or_else(|| CallError::Protocol(format!("invalid response message: {}", arr[2])))?
            .to_string();
        Ok(Self {
            id,
            code,
            message,
            result: arr[3].clone(),
        })
    }

    /// Decode a frame body into a response.
    pub fn decode_body(body: &[u8]) -> Result<Self, CallError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| CallError::Protocol(format!("decoding response: {e}")))?;
        Self::from_array(&value)
    }

    /// Positional array form, `[id, code, msg, result]`.
    pub fn to_array(&self) -> Value {
        serde_json::json!([self.id, self.code, self.message, self.result])
    }

    /// The carried result, or the runtime-reported error for non-zero codes.
    pub fn into_result(self) -> CallResult {
        if self.code == 0 {
            Ok(self.result)
        } else {
            Err(CallError::Api {
                code: self.code,
                message: self.message,
            })
        }
    }
}
