//! Command descriptors and the event-keyed registry.
//!
//! Parameters carry explicit descriptors (name, semantic type, optional
//! default) instead of being discovered by reflection; the dispatcher reads
//! them to classify payload fields, apply defaults, and detect injected
//! singletons. The registry is append-only while the app registers commands
//! and is frozen behind an `Arc` before serving starts.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

/// Semantic type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
    /// Accepts any JSON value.
    Any,
    /// Injected singleton, resolved from the dependency cache by key
    /// instead of being supplied by the caller.
    Injected(&'static str),
}

impl ParamType {
    fn label(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Any => "any",
            ParamType::Injected(_) => "injected",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Float => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            // An injected parameter supplied via payload passes through
            // unvalidated; a resource has no JSON shape.
            ParamType::Any | ParamType::Injected(_) => true,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared parameter of a command.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A parameter the caller must supply.
    pub fn required(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    /// A parameter that falls back to `default` when absent.
    pub fn with_default(name: &'static str, ty: ParamType, default: Value) -> Self {
        Self {
            name,
            ty,
            default: Some(default),
        }
    }

    /// A parameter resolved from the dependency cache under `key`.
    pub fn injected(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Injected(key),
            default: None,
        }
    }

    /// Check `value` against the declared type.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if self.ty.accepts(value) {
            Ok(())
        } else {
            Err(format!(
                "expected {} for parameter '{}', got {}",
                self.ty.label(),
                self.name,
                json_kind(value)
            ))
        }
    }
}

/// Resolved arguments passed to a handler: validated payload values plus
/// injected singletons.
#[derive(Default)]
pub struct CommandArgs {
    values: HashMap<String, Value>,
    resources: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn insert_resource(&mut self, name: impl Into<String>, resource: Arc<dyn Any + Send + Sync>) {
        self.resources.insert(name.into(), resource);
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name)?.as_str()
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.value(name)?.as_i64()
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.value(name)?.as_f64()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name)?.as_bool()
    }

    /// Downcast an injected singleton to its concrete type.
    pub fn resource<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.resources.get(name)?.clone().downcast::<T>().ok()
    }
}

/// Error type handlers may fail with.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>;

type Handler = Arc<dyn Fn(CommandArgs) -> HandlerFuture + Send + Sync>;

/// A registered command: declared name, parameter descriptors, handler.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub params: Vec<ParamSpec>,
    handler: Handler,
}

impl CommandSpec {
    pub fn new<F>(name: &'static str, params: Vec<ParamSpec>, handler: F) -> Self
    where
        F: Fn(CommandArgs) -> HandlerFuture + Send + Sync + 'static,
    {
        Self {
            name,
            params,
            handler: Arc::new(handler),
        }
    }

    pub(crate) fn invoke(&self, args: CommandArgs) -> HandlerFuture {
        (self.handler)(args)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Event key to ordered handler candidates. Multiple candidates may share a
/// key; dispatch consults the first one only.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Vec<CommandSpec>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the command's declared name.
    pub fn register(&mut self, spec: CommandSpec) {
        self.register_as(spec.name, spec);
    }

    /// Register under an explicit event key.
    pub fn register_as(&mut self, event: &str, spec: CommandSpec) {
        self.commands.entry(event.to_string()).or_default().push(spec);
    }

    /// Ordered candidates for an event key.
    pub fn candidates(&self, event: &str) -> Option<&[CommandSpec]> {
        self.commands.get(event).map(|specs| specs.as_slice())
    }

    /// Number of registered event keys.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
