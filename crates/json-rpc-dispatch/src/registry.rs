//! Explicit method-name → handler table, built once at startup.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::handler::{
    FunctionHandler, HandlerContext, HandlerError, HandlerKind, JsonRpcHandler,
    NotificationHandler, TypedHandler,
};

/// Method names starting with this prefix are reserved by JSON-RPC 2.0.
pub const RESERVED_METHOD_PREFIX: &str = "rpc.";

/// Registration failures, reported before any call is served
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("method name must not be empty")]
    EmptyMethodName,

    #[error("method '{0}' is already registered")]
    DuplicateMethod(String),

    #[error("method name '{0}' uses the reserved 'rpc.' prefix")]
    ReservedMethodName(String),
}

/// Immutable-after-startup table of handlers
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JsonRpcHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific method
    pub fn register<H>(&mut self, method: impl Into<String>, handler: H) -> Result<(), RegistryError>
    where
        H: JsonRpcHandler + 'static,
    {
        self.register_arc(method, Arc::new(handler))
    }

    /// Register an already shared handler
    pub fn register_arc(
        &mut self,
        method: impl Into<String>,
        handler: Arc<dyn JsonRpcHandler>,
    ) -> Result<(), RegistryError> {
        let method = method.into();
        Self::validate_name(&method)?;
        if self.handlers.contains_key(&method) {
            return Err(RegistryError::DuplicateMethod(method));
        }
        self.handlers.insert(method, handler);
        Ok(())
    }

    /// Register one handler under several method names. The handler can tell
    /// them apart through [`HandlerContext::method`].
    pub fn register_methods<H, I, S>(&mut self, methods: I, handler: H) -> Result<(), RegistryError>
    where
        H: JsonRpcHandler + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handler: Arc<dyn JsonRpcHandler> = Arc::new(handler);
        for method in methods {
            self.register_arc(method, Arc::clone(&handler))?;
        }
        Ok(())
    }

    /// Register an async closure over raw params
    pub fn register_fn<F, Fut>(&mut self, method: impl Into<String>, handler_fn: F) -> Result<(), RegistryError>
    where
        F: Fn(Option<Value>, HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(method, FunctionHandler::new(handler_fn))
    }

    /// Register an async closure with typed params and result
    pub fn register_typed<P, R, F, Fut>(
        &mut self,
        method: impl Into<String>,
        expected: impl Into<String>,
        handler_fn: F,
    ) -> Result<(), RegistryError>
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P, HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        self.register(method, TypedHandler::new(expected, handler_fn))
    }

    /// Register a fire-and-forget handler
    pub fn register_notification<P, F, Fut>(
        &mut self,
        method: impl Into<String>,
        expected: impl Into<String>,
        handler_fn: F,
    ) -> Result<(), RegistryError>
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P, HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register(method, NotificationHandler::new(expected, handler_fn))
    }

    pub fn get(&self, method: &str) -> Option<&Arc<dyn JsonRpcHandler>> {
        self.handlers.get(method)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered method names with their kind, sorted by name
    pub fn methods(&self) -> Vec<(String, HandlerKind)> {
        let mut methods: Vec<_> = self
            .handlers
            .iter()
            .map(|(name, handler)| (name.clone(), handler.kind()))
            .collect();
        methods.sort_by(|a, b| a.0.cmp(&b.0));
        methods
    }

    fn validate_name(method: &str) -> Result<(), RegistryError> {
        if method.is_empty() {
            return Err(RegistryError::EmptyMethodName);
        }
        if method.starts_with(RESERVED_METHOD_PREFIX) {
            return Err(RegistryError::ReservedMethodName(method.to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}
