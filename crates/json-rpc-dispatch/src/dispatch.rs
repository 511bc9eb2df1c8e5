//! Request/notification/batch dispatch and response assembly

use std::sync::Arc;

use futures::future::join_all;
use tracing::Level;

use crate::diagnostics::{SharedLog, TracingLog};
use crate::error::{JsonRpcError, JsonRpcTransportError};
use crate::handler::{HandlerContext, HandlerError, HandlerKind, JsonRpcHandler, ToJsonRpcError};
use crate::notification::JsonRpcNotification;
use crate::parse::{BatchEntry, ParsedMessage, ParsedPayload, parse};
use crate::registry::{HandlerRegistry, RegistryError};
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcMessage;
use crate::types::RequestId;

/// Dispatcher tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Run the elements of a batch concurrently. Response order always
    /// follows request order.
    pub concurrent_batches: bool,
    /// Reject batches with more elements than this
    pub max_batch_len: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrent_batches: true,
            max_batch_len: None,
        }
    }
}

/// What a call produced
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    /// One response (including parse failures)
    Single(JsonRpcMessage),
    /// Responses for the requests of a batch, in request order
    Batch(Vec<JsonRpcMessage>),
    /// Nothing to send: a notification or an all-notification batch
    NoResponse,
}

impl DispatchResult {
    /// Check if this result needs a response
    pub fn needs_response(&self) -> bool {
        !matches!(self, DispatchResult::NoResponse)
    }

    /// The responses carried, in order
    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            DispatchResult::Single(message) => std::slice::from_ref(message),
            DispatchResult::Batch(messages) => messages,
            DispatchResult::NoResponse => &[],
        }
    }

    /// Serialize for the wire; `None` means send nothing
    pub fn to_json_bytes(&self) -> Result<Option<Vec<u8>>, JsonRpcTransportError> {
        let bytes = match self {
            DispatchResult::Single(message) => serde_json::to_vec(message)?,
            DispatchResult::Batch(messages) => serde_json::to_vec(messages)?,
            DispatchResult::NoResponse => return Ok(None),
        };
        Ok(Some(bytes))
    }
}

/// Routes parsed messages to registered handlers
pub struct JsonRpcDispatcher {
    registry: HandlerRegistry,
    config: DispatcherConfig,
    log: SharedLog,
}

impl JsonRpcDispatcher {
    /// Dispatcher with default config, logging through `tracing`
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            config: DispatcherConfig::default(),
            log: Arc::new(TracingLog),
        }
    }

    pub fn builder() -> JsonRpcDispatcherBuilder {
        JsonRpcDispatcherBuilder::new()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Bytes in, bytes out. `Ok(None)` means nothing should be sent back.
    pub async fn handle_bytes(&self, body: &[u8]) -> Result<Option<Vec<u8>>, JsonRpcTransportError> {
        self.handle(body).await.to_json_bytes()
    }

    /// Parse and dispatch one raw body
    pub async fn handle(&self, body: &[u8]) -> DispatchResult {
        match parse(body) {
            Ok(payload) => self.handle_payload(payload).await,
            Err(error) => {
                self.log.log(Level::DEBUG, &format!("Rejected payload: {}", error.error));
                DispatchResult::Single(error.into())
            }
        }
    }

    /// Dispatch an already parsed payload
    pub async fn handle_payload(&self, payload: ParsedPayload) -> DispatchResult {
        match payload {
            ParsedPayload::Single(ParsedMessage::Request(request)) => {
                DispatchResult::Single(self.handle_request(request).await)
            }
            ParsedPayload::Single(ParsedMessage::Notification(notification)) => {
                self.handle_notification(notification).await;
                DispatchResult::NoResponse
            }
            ParsedPayload::Batch(entries) => self.handle_batch(entries).await,
        }
    }

    async fn handle_batch(&self, entries: Vec<BatchEntry>) -> DispatchResult {
        if let Some(limit) = self.config.max_batch_len {
            if entries.len() > limit {
                let error = JsonRpcError::invalid_request(
                    RequestId::Null,
                    format!("Batch of {} messages exceeds limit of {}", entries.len(), limit),
                );
                return DispatchResult::Single(error.into());
            }
        }

        let outcomes: Vec<Option<JsonRpcMessage>> = if self.config.concurrent_batches {
            join_all(entries.into_iter().map(|entry| self.handle_entry(entry))).await
        } else {
            let mut outcomes = Vec::with_capacity(entries.len());
            for entry in entries {
                outcomes.push(self.handle_entry(entry).await);
            }
            outcomes
        };

        let responses: Vec<JsonRpcMessage> = outcomes.into_iter().flatten().collect();
        if responses.is_empty() {
            DispatchResult::NoResponse
        } else {
            DispatchResult::Batch(responses)
        }
    }

    async fn handle_entry(&self, entry: BatchEntry) -> Option<JsonRpcMessage> {
        match entry {
            Ok(ParsedMessage::Request(request)) => Some(self.handle_request(request).await),
            Ok(ParsedMessage::Notification(notification)) => {
                self.handle_notification(notification).await;
                None
            }
            Err(error) => Some(error.into()),
        }
    }

    /// Process a JSON-RPC request and return its response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;

        let Some(handler) = self.registry.get(&method) else {
            self.log.log(
                Level::DEBUG,
                &format!("Method '{}' not found (id {})", method, id),
            );
            return JsonRpcError::method_not_found(id, &method).into();
        };

        if handler.kind() == HandlerKind::Notification {
            self.log.log(
                Level::DEBUG,
                &format!(
                    "Request {} targets notification method '{}'; answering with null",
                    id, method
                ),
            );
        }

        let ctx = HandlerContext::new(method.as_str(), Some(id.clone()), Arc::clone(&self.log));
        match handler.handle(params, ctx).await {
            Ok(result) => JsonRpcMessage::success(id, result),
            Err(error) => {
                let level = match error {
                    HandlerError::Internal(_) => Level::WARN,
                    _ => Level::DEBUG,
                };
                self.log.log(
                    level,
                    &format!("Method '{}' failed (id {}): {}", method, id, error),
                );
                JsonRpcMessage::error(id, error.to_error_object())
            }
        }
    }

    /// Process a JSON-RPC notification. Nothing is returned: failures and
    /// unknown methods are only logged.
    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        let JsonRpcNotification { method, params, .. } = notification;
        self.log.log(Level::DEBUG, &format!("Handling notification: {}", method));

        let Some(handler) = self.registry.get(&method) else {
            self.log.log(
                Level::WARN,
                &format!("Notification method '{}' is not available (ignored)", method),
            );
            return;
        };

        let ctx = HandlerContext::new(method.as_str(), None, Arc::clone(&self.log));
        if let Err(error) = handler.handle(params, ctx).await {
            self.log.log(
                Level::WARN,
                &format!("Notification error in '{}' (ignored): {}", method, error),
            );
        }
    }
}

impl std::fmt::Debug for JsonRpcDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcDispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`JsonRpcDispatcher`]. Registration errors are collected and
/// reported by [`build`](JsonRpcDispatcherBuilder::build).
pub struct JsonRpcDispatcherBuilder {
    registry: HandlerRegistry,
    config: DispatcherConfig,
    log: Option<SharedLog>,
    error: Option<RegistryError>,
}

impl JsonRpcDispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: DispatcherConfig::default(),
            log: None,
            error: None,
        }
    }

    /// Start from an existing registry
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a handler for a specific method
    pub fn handler<H>(mut self, method: impl Into<String>, handler: H) -> Self
    where
        H: JsonRpcHandler + 'static,
    {
        if let Err(error) = self.registry.register(method, handler) {
            self.error.get_or_insert(error);
        }
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn concurrent_batches(mut self, enable: bool) -> Self {
        self.config.concurrent_batches = enable;
        self
    }

    pub fn max_batch_len(mut self, limit: usize) -> Self {
        self.config.max_batch_len = Some(limit);
        self
    }

    /// Inject the diagnostic log; defaults to [`TracingLog`]
    pub fn log(mut self, log: SharedLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> Result<JsonRpcDispatcher, RegistryError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(JsonRpcDispatcher {
            registry: self.registry,
            config: self.config,
            log: self.log.unwrap_or_else(|| Arc::new(TracingLog)),
        })
    }
}

impl Default for JsonRpcDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemoryLog;
    use crate::error::JsonRpcErrorObject;
    use crate::handler::{FunctionHandler, NotificationHandler};
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Deserialize)]
    struct Pair {
        a: i64,
        b: i64,
    }

    const PAIR: &str = r#"{"a": number, "b": number}"#;

    fn registry(calls: Arc<AtomicUsize>) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry
            .register_typed("add", PAIR, |p: Pair, _ctx| async move {
                Ok::<_, HandlerError>(p.a + p.b)
            })
            .unwrap();
        registry
            .register_typed("divide", PAIR, |p: Pair, _ctx| async move {
                if p.b == 0 {
                    return Err(HandlerError::from(JsonRpcErrorObject::custom(
                        -32000,
                        "Division by zero",
                        Some(json!(format!("Cannot divide {} by zero", p.a))),
                    )));
                }
                Ok(p.a / p.b)
            })
            .unwrap();
        registry
            .register_fn("explode", |_params, _ctx| async move {
                Err::<Value, _>(HandlerError::internal("boiler pressure too high"))
            })
            .unwrap();
        registry
            .register_fn("slow", |params: Option<Value>, _ctx| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, HandlerError>(params.unwrap_or(Value::Null))
            })
            .unwrap();
        registry
            .register(
                "log",
                NotificationHandler::new(r#"{"message": string}"#, move |p: Value, ctx: HandlerContext| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        ctx.log(Level::INFO, &format!("log: {}", p["message"]));
                        Ok::<_, HandlerError>(())
                    }
                }),
            )
            .unwrap();
        registry
    }

    fn dispatcher() -> (JsonRpcDispatcher, Arc<MemoryLog>, Arc<AtomicUsize>) {
        let log = Arc::new(MemoryLog::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = JsonRpcDispatcher::builder()
            .registry(registry(Arc::clone(&calls)))
            .log(log.clone())
            .build()
            .unwrap();
        (dispatcher, log, calls)
    }

    async fn single(dispatcher: &JsonRpcDispatcher, body: &str) -> JsonRpcMessage {
        match dispatcher.handle(body.as_bytes()).await {
            DispatchResult::Single(message) => message,
            other => panic!("expected single response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_success() {
        let (dispatcher, _, _) = dispatcher();
        let bytes = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"add","params":{"a":15,"b":25},"id":1}"#)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"jsonrpc":"2.0","result":40,"id":1}"#
        );
    }

    #[tokio::test]
    async fn test_id_is_echoed_verbatim() {
        let (dispatcher, _, _) = dispatcher();
        for id in [json!("abc"), json!(7), json!(2.5), json!(null)] {
            let body = json!({"jsonrpc": "2.0", "method": "add", "params": {"a": 1, "b": 1}, "id": id});
            let response = single(&dispatcher, &body.to_string()).await;
            assert_eq!(serde_json::to_value(response.id()).unwrap(), id);
        }
    }

    #[tokio::test]
    async fn test_large_integer_id_is_echoed_exactly() {
        let (dispatcher, _, _) = dispatcher();
        let body = r#"{"jsonrpc":"2.0","method":"add","params":{"a":1,"b":1},"id":18446744073709551616}"#;
        let bytes = dispatcher.handle_bytes(body.as_bytes()).await.unwrap().unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"jsonrpc":"2.0","result":2,"id":18446744073709551616}"#
        );
    }

    #[tokio::test]
    async fn test_protocol_error_passes_through() {
        let (dispatcher, _, _) = dispatcher();
        let response = single(
            &dispatcher,
            r#"{"jsonrpc":"2.0","method":"divide","params":{"a":5,"b":0},"id":2}"#,
        )
        .await;

        assert_eq!(response.id(), &RequestId::from(2));
        let error = response.error_object().unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "Division by zero");
        assert_eq!(error.data, Some(json!("Cannot divide 5 by zero")));
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let (dispatcher, _, _) = dispatcher();
        let response = single(
            &dispatcher,
            r#"{"jsonrpc":"2.0","method":"add","params":{"a":"x"},"id":9}"#,
        )
        .await;
        let error = response.error_object().unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.data, Some(json!(format!("Expected parameters: {}", PAIR))));

        let response = single(&dispatcher, r#"{"jsonrpc":"2.0","method":"add","id":10}"#).await;
        let error = response.error_object().unwrap();
        assert_eq!(error.data, Some(json!(format!("Parameters required: {}", PAIR))));
    }

    #[tokio::test]
    async fn test_internal_error_is_wrapped() {
        let (dispatcher, log, _) = dispatcher();
        let response = single(&dispatcher, r#"{"jsonrpc":"2.0","method":"explode","id":"x"}"#).await;

        let error = response.error_object().unwrap();
        assert_eq!(error.code, -32603);
        assert_eq!(error.data, Some(json!("boiler pressure too high")));
        assert!(log.contains(Level::WARN, "explode"));
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let (dispatcher, _, _) = dispatcher();
        let response = single(&dispatcher, r#"{"jsonrpc":"2.0","method":"foo","id":4}"#).await;

        assert_eq!(response.id(), &RequestId::from(4));
        assert_eq!(response.error_object().unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_invalid_version_never_reaches_handler() {
        let (dispatcher, _, calls) = dispatcher();
        let response = single(&dispatcher, r#"{"jsonrpc":"1.0","method":"log","id":3}"#).await;

        assert_eq!(response.error_object().unwrap().code, -32600);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let (dispatcher, _, _) = dispatcher();
        let response = single(&dispatcher, r#"{"jsonrpc":"2.0","method":"#).await;

        assert_eq!(response.id(), &RequestId::Null);
        assert_eq!(response.error_object().unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_notifications_produce_nothing() {
        let (dispatcher, log, calls) = dispatcher();

        for body in [
            r#"{"jsonrpc":"2.0","method":"log","params":{"message":"hello"}}"#,
            r#"{"jsonrpc":"2.0","method":"explode"}"#,
            r#"{"jsonrpc":"2.0","method":"nope"}"#,
            r#"{"jsonrpc":"2.0","method":"add","params":{"a":"bad"}}"#,
        ] {
            assert_eq!(dispatcher.handle_bytes(body.as_bytes()).await.unwrap(), None, "body: {}", body);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(log.contains(Level::INFO, "hello"));
        assert!(log.contains(Level::WARN, "Notification error in 'explode'"));
        assert!(log.contains(Level::WARN, "'nope' is not available"));
        assert!(log.contains(Level::WARN, "Notification error in 'add'"));
    }

    #[tokio::test]
    async fn test_request_to_notification_handler_answers_null() {
        let (dispatcher, _, calls) = dispatcher();
        let response = single(
            &dispatcher,
            r#"{"jsonrpc":"2.0","method":"log","params":{"message":"hi"},"id":11}"#,
        )
        .await;

        assert_eq!(response.result(), Some(&Value::Null));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_keeps_request_order() {
        let (dispatcher, _, calls) = dispatcher();
        let body = r#"[
            {"jsonrpc":"2.0","method":"slow","params":"first","id":1},
            {"jsonrpc":"2.0","method":"log","params":{"message":"in batch"}},
            {"jsonrpc":"2.0","method":"add","params":{"a":2,"b":3},"id":2},
            {"jsonrpc":"1.0","method":"add","id":3},
            {"jsonrpc":"2.0","method":"foo","id":4}
        ]"#;

        let DispatchResult::Batch(responses) = dispatcher.handle(body.as_bytes()).await else {
            panic!("expected batch");
        };
        let ids: Vec<_> = responses.iter().map(|r| r.id().clone()).collect();
        assert_eq!(
            ids,
            vec![RequestId::from(1), RequestId::from(2), RequestId::from(3), RequestId::from(4)]
        );
        assert_eq!(responses[0].result(), Some(&json!("first")));
        assert_eq!(responses[1].result(), Some(&json!(5)));
        assert_eq!(responses[2].error_object().unwrap().code, -32600);
        assert_eq!(responses[3].error_object().unwrap().code, -32601);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_batches_match_concurrent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sequential = JsonRpcDispatcher::builder()
            .registry(registry(calls))
            .concurrent_batches(false)
            .build()
            .unwrap();
        let (concurrent, _, _) = dispatcher();

        let body = br#"[{"jsonrpc":"2.0","method":"slow","params":1,"id":"a"},{"jsonrpc":"2.0","method":"add","params":{"a":1,"b":1},"id":"b"}]"#;
        assert_eq!(sequential.handle(body).await, concurrent.handle(body).await);
    }

    #[tokio::test]
    async fn test_all_notification_and_empty_batches() {
        let (dispatcher, _, calls) = dispatcher();
        let body = r#"[{"jsonrpc":"2.0","method":"log","params":{"message":"a"}},{"jsonrpc":"2.0","method":"log","params":{"message":"b"}}]"#;

        assert_eq!(dispatcher.handle(body.as_bytes()).await, DispatchResult::NoResponse);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.handle_bytes(b"[]").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let dispatcher = JsonRpcDispatcher::builder()
            .registry(registry(Arc::new(AtomicUsize::new(0))))
            .max_batch_len(1)
            .build()
            .unwrap();
        let body = br#"[{"jsonrpc":"2.0","method":"add","params":{"a":1,"b":1},"id":1},{"jsonrpc":"2.0","method":"add","params":{"a":1,"b":1},"id":2}]"#;

        let DispatchResult::Single(response) = dispatcher.handle(body).await else {
            panic!("expected single error");
        };
        assert_eq!(response.id(), &RequestId::Null);
        assert_eq!(response.error_object().unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_builder_reports_registration_error() {
        let result = JsonRpcDispatcher::builder()
            .handler("", FunctionHandler::new(|_p, _ctx| async move { Ok::<_, HandlerError>(Value::Null) }))
            .build();
        assert_eq!(result.unwrap_err(), RegistryError::EmptyMethodName);
    }

    #[test]
    fn test_dispatch_result_properties() {
        let single = DispatchResult::Single(JsonRpcMessage::success(RequestId::from(1), json!({})));
        assert!(single.needs_response());
        assert_eq!(single.messages().len(), 1);

        assert!(!DispatchResult::NoResponse.needs_response());
        assert_eq!(DispatchResult::NoResponse.to_json_bytes().unwrap(), None);

        let batch = DispatchResult::Batch(vec![JsonRpcMessage::success(RequestId::from(1), json!(1))]);
        let bytes = batch.to_json_bytes().unwrap().unwrap();
        assert_eq!(bytes.first(), Some(&b'['));
    }
}
