//! Bridge to the native windowing runtime.
//!
//! Calls issued anywhere in the process are funneled through a single relay
//! task that exchanges length-prefixed JSON frames with the runtime over TCP,
//! one request/response pair at a time. Responses are matched back to their
//! callers by a bounded correlation id.

pub mod error;
pub mod invoke;
pub mod pending;
pub mod relay;
pub mod window;
pub mod wire;

#[cfg(test)]
mod test_support;

pub use error::CallError;
pub use invoke::{normalize_args, RuntimeHandle};
pub use pending::PendingCalls;
pub use relay::{QueuedCall, Relay};
pub use window::Window;
pub use wire::{ApiRequest, ApiResponse};

/// Result of a single runtime call.
pub type CallResult = Result<serde_json::Value, CallError>;
