use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::Level;

use crate::diagnostics::SharedLog;
use crate::error::JsonRpcErrorObject;
use crate::types::RequestId;

/// Whether a handler answers its caller or is fire-and-forget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Produces a result that is sent back for requests
    Request,
    /// Produces nothing; meant to be invoked as a notification
    Notification,
}

/// Per-invocation context handed to handlers
#[derive(Clone)]
pub struct HandlerContext {
    method: String,
    request_id: Option<RequestId>,
    log: SharedLog,
}

impl HandlerContext {
    pub fn new(method: impl Into<String>, request_id: Option<RequestId>, log: SharedLog) -> Self {
        Self {
            method: method.into(),
            request_id,
            log,
        }
    }

    /// Method name the handler was invoked under
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Id of the originating request, `None` for notifications
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn is_notification(&self) -> bool {
        self.request_id.is_none()
    }

    /// Write to the injected diagnostic log
    pub fn log(&self, level: Level, message: &str) {
        self.log.log(level, message);
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("method", &self.method)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Classified handler failure
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Fully formed protocol error, passed to the caller unchanged
    #[error("{0}")]
    Protocol(JsonRpcErrorObject),

    /// Params did not match what the handler expects
    #[error("Invalid params: {expected}")]
    InvalidParams { expected: String },

    /// Anything else; reported as an internal error
    #[error("{0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn protocol(error: JsonRpcErrorObject) -> Self {
        HandlerError::Protocol(error)
    }

    pub fn invalid_params(expected: impl Into<String>) -> Self {
        HandlerError::InvalidParams {
            expected: expected.into(),
        }
    }

    pub fn internal(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Internal(error.into())
    }
}

impl From<JsonRpcErrorObject> for HandlerError {
    fn from(error: JsonRpcErrorObject) -> Self {
        HandlerError::Protocol(error)
    }
}

/// Trait for errors that can be converted to JSON-RPC error objects
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    /// Convert this error to a JSON-RPC error object
    fn to_error_object(&self) -> JsonRpcErrorObject;
}

impl ToJsonRpcError for HandlerError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            HandlerError::Protocol(error) => error.clone(),
            HandlerError::InvalidParams { expected } => JsonRpcErrorObject::invalid_params(expected),
            HandlerError::Internal(error) => JsonRpcErrorObject::internal_error(Some(error.to_string())),
        }
    }
}

/// Decode raw params into `T`.
///
/// Absent params are offered to `T` as `null` first, so `()` and `Option<_>`
/// accept a call without params. `expected` describes the accepted shape and
/// ends up in the `data` of the InvalidParams error.
pub fn decode_params<T>(params: Option<Value>, expected: &str) -> Result<T, HandlerError>
where
    T: DeserializeOwned,
{
    match params {
        Some(value) => serde_json::from_value(value)
            .map_err(|_| HandlerError::invalid_params(format!("Expected parameters: {}", expected))),
        None => serde_json::from_value(Value::Null)
            .map_err(|_| HandlerError::invalid_params(format!("Parameters required: {}", expected))),
    }
}

/// Trait for handling a single JSON-RPC method
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    /// Declares how the handler is meant to be called
    fn kind(&self) -> HandlerKind {
        HandlerKind::Request
    }

    /// Handle one invocation. Notification-style handlers return `Value::Null`.
    async fn handle(&self, params: Option<Value>, ctx: HandlerContext) -> Result<Value, HandlerError>;
}

/// A handler over raw params, built from an async closure
pub struct FunctionHandler<F> {
    handler_fn: F,
}

impl<F, Fut> FunctionHandler<F>
where
    F: Fn(Option<Value>, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

#[async_trait]
impl<F, Fut> JsonRpcHandler for FunctionHandler<F>
where
    F: Fn(Option<Value>, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    async fn handle(&self, params: Option<Value>, ctx: HandlerContext) -> Result<Value, HandlerError> {
        (self.handler_fn)(params, ctx).await
    }
}

/// A handler whose params and result are typed
pub struct TypedHandler<P, R, F> {
    handler_fn: F,
    expected: String,
    _marker: PhantomData<fn(P) -> R>,
}

impl<P, R, F, Fut> TypedHandler<P, R, F>
where
    P: DeserializeOwned + Send,
    R: Serialize + Send,
    F: Fn(P, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HandlerError>> + Send,
{
    /// `expected` is the human-readable params shape, e.g. `{"a": number}`
    pub fn new(expected: impl Into<String>, handler_fn: F) -> Self {
        Self {
            handler_fn,
            expected: expected.into(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<P, R, F, Fut> JsonRpcHandler for TypedHandler<P, R, F>
where
    P: DeserializeOwned + Send,
    R: Serialize + Send,
    F: Fn(P, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HandlerError>> + Send,
{
    async fn handle(&self, params: Option<Value>, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let params: P = decode_params(params, &self.expected)?;
        let result = (self.handler_fn)(params, ctx).await?;
        serde_json::to_value(result).map_err(HandlerError::internal)
    }
}

/// A fire-and-forget handler with typed params
pub struct NotificationHandler<P, F> {
    handler_fn: F,
    expected: String,
    _marker: PhantomData<fn(P)>,
}

impl<P, F, Fut> NotificationHandler<P, F>
where
    P: DeserializeOwned + Send,
    F: Fn(P, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    pub fn new(expected: impl Into<String>, handler_fn: F) -> Self {
        Self {
            handler_fn,
            expected: expected.into(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<P, F, Fut> JsonRpcHandler for NotificationHandler<P, F>
where
    P: DeserializeOwned + Send,
    F: Fn(P, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    fn kind(&self) -> HandlerKind {
        HandlerKind::Notification
    }

    async fn handle(&self, params: Option<Value>, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let params: P = decode_params(params, &self.expected)?;
        (self.handler_fn)(params, ctx).await?;
        Ok(Value::Null)
    }
}
