//! # HTTP JSON-RPC Server
//!
//! HTTP transport for [`json_rpc_dispatch::JsonRpcDispatcher`]. A single POST
//! endpoint accepts JSON-RPC payloads; notifications and all-notification
//! batches are answered with `204 No Content`.
//!
//! ## Features
//! - POST-only JSON-RPC endpoint with content-type and body-size checks
//! - CORS support for browser-based clients
//! - Health check endpoint
//! - Graceful shutdown on a caller-supplied signal

pub mod cors;
pub mod handler;
pub mod server;

// Re-export main types
pub use cors::CorsLayer;
pub use handler::JsonRpcHttpHandler;
pub use server::{HttpJsonRpcServer, HttpJsonRpcServerBuilder, ListeningServer, ServerConfig};

// Re-export foundational types
pub use json_rpc_dispatch::{HandlerRegistry, JsonRpcDispatcher};

/// Result type for HTTP JSON-RPC operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] json_rpc_dispatch::JsonRpcTransportError),
}
