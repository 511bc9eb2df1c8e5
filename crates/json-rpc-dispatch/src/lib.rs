//! # JSON-RPC 2.0 Dispatch
//!
//! A transport-agnostic JSON-RPC 2.0 parser and dispatcher. Raw bytes go in,
//! response bytes (or nothing, for notifications) come out.
//!
//! ## Features
//! - Single requests, notifications and batches
//! - Explicit handler registration, no reflection
//! - Typed params decoding with InvalidParams reporting
//! - Concurrent batch execution with request-ordered responses
//! - Injected diagnostic logging
//!
//! ```rust,no_run
//! use json_rpc_dispatch::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Pair {
//!     a: f64,
//!     b: f64,
//! }
//!
//! # async fn run() -> Result<(), RegistryError> {
//! let mut registry = HandlerRegistry::new();
//! registry.register_typed("add", r#"{"a": number, "b": number}"#, |p: Pair, _ctx| async move {
//!     Ok::<_, HandlerError>(p.a + p.b)
//! })?;
//!
//! let dispatcher = JsonRpcDispatcher::new(registry);
//! let reply = dispatcher
//!     .handle(br#"{"jsonrpc":"2.0","method":"add","params":{"a":1,"b":2},"id":1}"#)
//!     .await;
//! assert!(reply.needs_response());
//! # Ok(())
//! # }
//! ```

pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod notification;
pub mod parse;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types
pub use diagnostics::{DiagnosticLog, LogEntry, MemoryLog, SharedLog, TracingLog};
pub use dispatch::{DispatchResult, DispatcherConfig, JsonRpcDispatcher, JsonRpcDispatcherBuilder};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcTransportError};
pub use handler::{
    FunctionHandler, HandlerContext, HandlerError, HandlerKind, JsonRpcHandler, NotificationHandler,
    ToJsonRpcError, TypedHandler, decode_params,
};
pub use notification::JsonRpcNotification;
pub use parse::{BatchEntry, ParsedMessage, ParsedPayload, parse, parse_single, parse_value};
pub use registry::{HandlerRegistry, RegistryError};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    // Whole range reserved for the protocol
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32000;
}
