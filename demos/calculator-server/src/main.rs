//! JSON-RPC Calculator Server
//!
//! Usage:
//! ```bash
//! # Default (all interfaces, port 8090, endpoint at /)
//! RUST_LOG=info cargo run --package calculator-server
//!
//! # Custom port, sequential batch execution
//! cargo run --package calculator-server -- --port 9000 --sequential-batches
//! ```

use std::net::{IpAddr, SocketAddr};

use anyhow::Result;
use calculator_server::{SERVICE_NAME, calculator_registry};
use clap::Parser;
use json_rpc_dispatch::JsonRpcDispatcher;
use json_rpc_http_server::HttpJsonRpcServer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "calculator_server=info,json_rpc_dispatch=info,json_rpc_http_server=info";

/// Command-line arguments for the calculator server
#[derive(Parser, Debug)]
#[command(name = "calculator-server")]
#[command(about = "JSON-RPC 2.0 calculator served over HTTP")]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to bind the server to
    #[arg(short, long, default_value = "8090")]
    port: u16,

    /// Path of the JSON-RPC endpoint
    #[arg(long, default_value = "/")]
    path: String,

    /// Maximum request body size in bytes
    #[arg(long, default_value = "1048576")]
    max_body_size: usize,

    /// Do not send CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Run the elements of a batch one after another
    #[arg(long)]
    sequential_batches: bool,

    /// Reject batches with more elements than this
    #[arg(long)]
    max_batch_len: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut dispatcher = JsonRpcDispatcher::builder()
        .registry(calculator_registry()?)
        .concurrent_batches(!args.sequential_batches);
    if let Some(limit) = args.max_batch_len {
        dispatcher = dispatcher.max_batch_len(limit);
    }

    let server = HttpJsonRpcServer::builder()
        .bind_address(SocketAddr::new(args.host, args.port))
        .rpc_path(args.path.clone())
        .cors(!args.no_cors)
        .max_body_size(args.max_body_size)
        .service_name(SERVICE_NAME)
        .dispatcher(dispatcher.build()?)
        .build();

    info!("Starting {} on port {}", SERVICE_NAME, args.port);
    info!("Health check available at: http://localhost:{}/health", args.port);
    info!("JSON-RPC endpoint at: http://localhost:{}{}", args.port, args.path);
    info!(
        r#"Try: curl -X POST -H "Content-Type: application/json" -d '{{"jsonrpc":"2.0","method":"add","params":{{"a":10,"b":20}},"id":1}}' http://localhost:{}{}"#,
        args.port, args.path
    );

    server
        .run_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", err);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
