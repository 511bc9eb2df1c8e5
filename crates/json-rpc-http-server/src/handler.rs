//! HTTP request handler for JSON-RPC

use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use serde_json::json;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::{CorsLayer, Result, ServerConfig};
use json_rpc_dispatch::JsonRpcDispatcher;

/// HTTP handler for JSON-RPC requests
#[derive(Clone)]
pub struct JsonRpcHttpHandler {
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) dispatcher: Arc<JsonRpcDispatcher>,
}

impl JsonRpcHttpHandler {
    /// Create a new handler
    pub fn new(config: Arc<ServerConfig>, dispatcher: Arc<JsonRpcDispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Route one HTTP request. Never fails: every problem maps to a status.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let span = info_span!(
            "rpc_call",
            call_id = %Uuid::now_v7(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        async move {
            let mut response = self.route(req).await;
            if self.config.enable_cors {
                CorsLayer::apply_cors_headers(response.headers_mut());
            }
            debug!("Responding with {}", response.status());
            response
        }
        .instrument(span)
        .await
    }

    async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = req.uri().path().to_string();

        if req.method() == Method::OPTIONS {
            return empty_response(StatusCode::OK);
        }

        if path == self.config.rpc_path {
            if req.method() != Method::POST {
                return method_not_allowed("POST, OPTIONS", "Only POST method is allowed for JSON-RPC");
            }
            return self.handle_json_rpc_request(req).await;
        }

        if path == self.config.health_path {
            if req.method() != Method::GET {
                return method_not_allowed("GET, OPTIONS", "Only GET method is allowed for health checks");
            }
            return self.handle_health();
        }

        error_response(StatusCode::NOT_FOUND, "Not found")
    }

    /// Handle JSON-RPC requests over HTTP POST
    async fn handle_json_rpc_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("");

        if !content_type.contains("application/json") {
            warn!("Invalid content type: {}", content_type);
            return error_response(
                StatusCode::BAD_REQUEST,
                "Content-Type must be application/json",
            );
        }

        let body = Limited::new(req.into_body(), self.config.max_body_size);
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(
                    "Request body exceeds {} bytes",
                    self.config.max_body_size
                );
                return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return error_response(StatusCode::BAD_REQUEST, "Cannot read request body");
            }
        };

        debug!("Received JSON-RPC payload of {} bytes", body_bytes.len());

        match self.dispatch(&body_bytes).await {
            Ok(Some(bytes)) => json_response(StatusCode::OK, bytes),
            Ok(None) => empty_response(StatusCode::NO_CONTENT),
            Err(err) => {
                error!("Failed to encode JSON-RPC response: {}", err);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }

    async fn dispatch(&self, body: &[u8]) -> Result<Option<Bytes>> {
        let encoded = self.dispatcher.handle_bytes(body).await?;
        Ok(encoded.map(Bytes::from))
    }

    fn handle_health(&self) -> Response<Full<Bytes>> {
        match self.health_body() {
            Ok(bytes) => json_response(StatusCode::OK, bytes),
            Err(err) => {
                error!("Failed to encode health response: {}", err);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }

    fn health_body(&self) -> Result<Bytes> {
        let body = serde_json::to_vec(&json!({
            "status": "healthy",
            "service": self.config.service_name,
        }))?;
        Ok(Bytes::from(body))
    }
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// `{"error": message}` with the given status
fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = json!({ "error": message }).to_string();
    json_response(status, Bytes::from(body))
}

fn method_not_allowed(allow: &'static str, message: &str) -> Response<Full<Bytes>> {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, message);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}
