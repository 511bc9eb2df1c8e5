//! HTTP JSON-RPC server
//!
//! One tokio task per connection, hyper http1 on each. The server can be
//! bound first and served later so callers can read the bound address when
//! binding to port 0.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use json_rpc_dispatch::{HandlerRegistry, JsonRpcDispatcher};

use crate::{JsonRpcHttpHandler, Result};

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path for the JSON-RPC endpoint
    pub rpc_path: String,
    /// Path for the health check
    pub health_path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Reported by the health check
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8090)),
            rpc_path: "/".to_string(),
            health_path: "/health".to_string(),
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
            service_name: "json-rpc-server".to_string(),
        }
    }
}

/// Builder for [`HttpJsonRpcServer`]
pub struct HttpJsonRpcServerBuilder {
    config: ServerConfig,
    dispatcher: Option<JsonRpcDispatcher>,
}

impl HttpJsonRpcServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the JSON-RPC endpoint path
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.rpc_path = path.into();
        self
    }

    /// Set the health check path
    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.config.health_path = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Serve calls through this dispatcher
    pub fn dispatcher(mut self, dispatcher: JsonRpcDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Serve calls through a default dispatcher over `registry`
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.dispatcher = Some(JsonRpcDispatcher::new(registry));
        self
    }

    pub fn build(self) -> HttpJsonRpcServer {
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| JsonRpcDispatcher::new(HandlerRegistry::new()));
        let config = Arc::new(self.config);
        let handler = JsonRpcHttpHandler::new(Arc::clone(&config), Arc::new(dispatcher));

        HttpJsonRpcServer { config, handler }
    }
}

impl Default for HttpJsonRpcServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP JSON-RPC server
#[derive(Clone)]
pub struct HttpJsonRpcServer {
    config: Arc<ServerConfig>,
    handler: JsonRpcHttpHandler,
}

impl HttpJsonRpcServer {
    pub fn builder() -> HttpJsonRpcServerBuilder {
        HttpJsonRpcServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The request handler, for driving the server without a socket
    pub fn handler(&self) -> &JsonRpcHttpHandler {
        &self.handler
    }

    /// Bind the listener without serving yet
    pub async fn bind(&self) -> Result<ListeningServer> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        info!("HTTP JSON-RPC server listening on {}", local_addr);
        info!("JSON-RPC endpoint available at: {}", self.config.rpc_path);

        Ok(ListeningServer {
            listener,
            local_addr,
            handler: self.handler.clone(),
        })
    }

    /// Serve until the process is stopped
    pub async fn run(&self) -> Result<()> {
        self.bind().await?.serve().await
    }

    /// Serve until `signal` resolves
    pub async fn run_with_shutdown<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.bind().await?.serve_with_shutdown(signal).await
    }
}

/// A bound server that has not started accepting yet
pub struct ListeningServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: JsonRpcHttpHandler,
}

impl ListeningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `signal` resolves. Connections already
    /// accepted run to completion on their own tasks.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let mut signal = std::pin::pin!(signal);

        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = self.listener.accept() => accepted?,
                () = &mut signal => {
                    info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected: {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
