use std::time::Duration;

/// Failure of a single call to the native runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// Connect, read or write failed, or a frame was truncated/oversized.
    #[error("transport fault: {0}")]
    Transport(String),

    /// The response arrived but its shape is not a valid wire message.
    #[error("protocol fault: {0}")]
    Protocol(String),

    /// No response within the per-call bound.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// Every correlation id is currently outstanding.
    #[error("correlation id space exhausted")]
    IdSpaceExhausted,

    /// The runtime answered with a non-zero status code.
    #[error("[API-{code}] {message}")]
    Api { code: i64, message: String },

    /// The relay loop terminated before this call completed.
    #[error("relay shut down")]
    RelayShutdown,
}

impl From<std::io::Error> for CallError {
    fn from(err: std::io::Error) -> Self {
        CallError::Transport(err.to_string())
    }
}
