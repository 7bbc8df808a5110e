//! Extension handlers invoked by `plugin` statements
//!
//! The interpreter only sees the `Handler` capability. How handlers are
//! discovered or loaded is up to whoever fills the registry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::registry::SharedTable;

/// Failure reported by an extension handler
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InvocationError {
    pub message: String,
}

impl InvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A named capability taking one JSON object and returning one JSON object
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, input: JsonValue) -> Result<JsonValue, InvocationError>;
}

/// Adapts an async closure into a `Handler`
pub struct FnHandler<F> {
    func: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(JsonValue) -> Fut + Send + Sync,
    Fut: Future<Output = Result<JsonValue, InvocationError>> + Send,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(JsonValue) -> Fut + Send + Sync,
    Fut: Future<Output = Result<JsonValue, InvocationError>> + Send,
{
    async fn invoke(&self, input: JsonValue) -> Result<JsonValue, InvocationError> {
        (self.func)(input).await
    }
}

/// Handlers by name
#[derive(Default)]
pub struct ExtensionRegistry {
    table: SharedTable<Arc<dyn Handler>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        let mut entries = HashMap::new();
        entries.insert(name.into(), handler);
        self.table.merge(entries);
    }

    /// Register a plain async closure
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(JsonValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonValue, InvocationError>> + Send + 'static,
    {
        self.register(name, Arc::new(FnHandler::new(func)));
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.table.get(name)
    }

    /// Publish `handlers` as the complete set
    pub fn replace_all(&self, handlers: HashMap<String, Arc<dyn Handler>>) {
        self.table.replace(handlers);
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.snapshot().keys().cloned().collect();
        names.sort();
        names
    }
}
