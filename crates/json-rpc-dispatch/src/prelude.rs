//! # JSON-RPC Dispatch Prelude
//!
//! Re-exports of the types needed to register handlers and serve calls.
//!
//! ```rust
//! use json_rpc_dispatch::prelude::*;
//! ```

// Core JSON-RPC types
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::notification::JsonRpcNotification;
pub use crate::request::JsonRpcRequest;
pub use crate::response::{JsonRpcMessage, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

// Handlers and dispatch
pub use crate::diagnostics::{DiagnosticLog, SharedLog};
pub use crate::dispatch::{DispatchResult, DispatcherConfig, JsonRpcDispatcher};
pub use crate::handler::{HandlerContext, HandlerError, HandlerKind, JsonRpcHandler};
pub use crate::registry::{HandlerRegistry, RegistryError};

// Standard error codes
pub use crate::error_codes::*;
