//! Dispatch: resolve a frontend event to a handler, validate and resolve its
//! parameters, invoke it, and package the outcome for broadcast.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::deps::{DependencyCache, DependencyError};
use crate::registry::{CommandArgs, CommandRegistry, CommandSpec, ParamSpec, ParamType};

/// Why a dispatch failed. Every variant reaches the frontend as a single
/// structured `{error_id, error}` message.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for event '{0}'")]
    UnknownCommand(String),

    /// Every missing parameter, not just the first.
    #[error("invalid parameters: {}", missing_list(.0))]
    MissingParameters(Vec<String>),

    /// Every failed type check.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("cannot resolve parameter '{param}': {source}")]
    Dependency {
        param: String,
        source: DependencyError,
    },

    /// The handler itself failed; carries its message verbatim.
    #[error("{0}")]
    Handler(String),
}

fn missing_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("{name} is missing"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Packaged dispatch result, serialized once and broadcast to every client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    Success { result_id: i64, result: Value },
    Error { error_id: i64, error: String },
}

/// Looks up candidates, resolves parameters, and invokes handlers.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    resources: Arc<DependencyCache>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, resources: Arc<DependencyCache>) -> Self {
        Self {
            registry,
            resources,
        }
    }

    /// Dispatch one frontend event and package the outcome under the caller's
    /// result/error tags.
    pub async fn dispatch(
        &self,
        event: &str,
        result_id: i64,
        error_id: i64,
        payload: &Map<String, Value>,
    ) -> DispatchOutcome {
        match self.run(event, payload).await {
            Ok(result) => {
                tracing::debug!(%event, "command dispatched");
                DispatchOutcome::Success { result_id, result }
            }
            Err(error) => {
                tracing::warn!(%event, error = %error, "command dispatch failed");
                DispatchOutcome::Error {
                    error_id,
                    error: error.to_string(),
                }
            }
        }
    }

    async fn run(
        &self,
        event: &str,
        payload: &Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        let spec = self.first_candidate(event)?;

        // Classify every declared parameter before reporting anything, so a
        // caller sees the full list of problems at once.
        let mut supplied: Vec<(&ParamSpec, &Value)> = Vec::new();
        let mut injected: Vec<(&ParamSpec, &'static str)> = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        for param in &spec.params {
            if let Some(value) = payload.get(param.name) {
                supplied.push((param, value));
            } else if let Some(default) = &param.default {
                supplied.push((param, default));
            } else if let ParamType::Injected(key) = param.ty {
                injected.push((param, key));
            } else {
                missing.push(param.name.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(DispatchError::MissingParameters(missing));
        }

        let mut args = CommandArgs::new();
        for (param, key) in injected {
            let resource =
                self.resources
                    .resolve(key)
                    .map_err(|source| DispatchError::Dependency {
                        param: param.name.to_string(),
                        source,
                    })?;
            args.insert_resource(param.name, resource);
        }

        let mut diagnostics: Vec<String> = Vec::new();
        for (param, value) in &supplied {
            if let Err(message) = param.validate(value) {
                diagnostics.push(message);
            }
        }
        if !diagnostics.is_empty() {
            return Err(DispatchError::Validation(diagnostics));
        }
        for (param, value) in supplied {
            args.insert_value(param.name, value.clone());
        }

        spec.invoke(args)
            .await
            .map_err(|e| DispatchError::Handler(e.to_string()))
    }

    /// The first registered candidate for `event`. Later candidates are never
    /// consulted, even when the first one fails.
    fn first_candidate(&self, event: &str) -> Result<&CommandSpec, DispatchError> {
        self.registry
            .candidates(event)
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| DispatchError::UnknownCommand(event.to_string()))
    }
}
