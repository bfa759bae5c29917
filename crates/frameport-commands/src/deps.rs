//! Process-lifetime singleton cache for injected parameters.
//!
//! Providers are registered once at startup and capture whatever context
//! their dependency needs. Instances are constructed lazily on first use and
//! never replaced.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Resource = Arc<dyn Any + Send + Sync>;

type Provider = Box<dyn Fn() -> Result<Resource, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum DependencyError {
    #[error("no provider registered for '{0}'")]
    UnknownProvider(String),

    #[error("constructing '{key}': {message}")]
    Construction { key: String, message: String },
}

#[derive(Default)]
pub struct DependencyCache {
    providers: HashMap<&'static str, Provider>,
    instances: Mutex<HashMap<&'static str, Resource>>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for `key`. Called during startup only.
    pub fn provide<T, F>(&mut self, key: &'static str, construct: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<T, Box<dyn std::error::Error + Send + Sync>> + Send + Sync + 'static,
    {
        self.providers.insert(
            key,
            Box::new(move || construct().map(|value| Arc::new(value) as Resource)),
        );
    }

    /// The singleton for `key`, constructing it on first use. Concurrent
    /// first uses race on construction but the first stored instance wins,
    /// so every caller observes the same one.
    pub fn resolve(&self, key: &str) -> Result<Resource, DependencyError> {
        if let Some(existing) = self.instances.lock().unwrap().get(key) {
            return Ok(existing.clone());
        }

        let (stored_key, provider) = self
            .providers
            .get_key_value(key)
            .ok_or_else(|| DependencyError::UnknownProvider(key.to_string()))?;
        let constructed = provider().map_err(|e| DependencyError::Construction {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        let mut instances = self.instances.lock().unwrap();
        Ok(instances.entry(*stored_key).or_insert(constructed).clone())
    }
}
