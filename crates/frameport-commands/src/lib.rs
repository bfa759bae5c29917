//! Command registry and dispatcher for frontend events.
//!
//! Commands are registered once at startup with explicit parameter
//! descriptors; dispatch validates the payload against them, resolves
//! injected singletons, invokes the handler, and packages the outcome for
//! broadcast.

pub mod deps;
pub mod dispatch;
pub mod registry;

pub use deps::{DependencyCache, DependencyError};
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher};
pub use registry::{CommandArgs, CommandRegistry, CommandSpec, ParamSpec, ParamType};
