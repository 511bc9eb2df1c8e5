//! Inbound message parsing
//!
//! The parser is the only place that decides what kind of message a payload
//! carries. Everything downstream works on [`ParsedPayload`] and
//! [`ParsedMessage`] instead of inspecting raw JSON fields.

use serde_json::{Map, Value};

use crate::error::JsonRpcError;
use crate::notification::JsonRpcNotification;
use crate::request::JsonRpcRequest;
use crate::types::RequestId;

/// A single inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl ParsedMessage {
    /// Get the method name
    pub fn method(&self) -> &str {
        match self {
            ParsedMessage::Request(req) => &req.method,
            ParsedMessage::Notification(notif) => &notif.method,
        }
    }

    /// Check if this is a request (has ID)
    pub fn is_request(&self) -> bool {
        matches!(self, ParsedMessage::Request(_))
    }

    /// Check if this is a notification (no ID)
    pub fn is_notification(&self) -> bool {
        matches!(self, ParsedMessage::Notification(_))
    }

    /// Get the request ID if this is a request
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            ParsedMessage::Request(req) => Some(&req.id),
            ParsedMessage::Notification(_) => None,
        }
    }
}

/// One entry of a batch. Entries are parsed independently, so a bad entry
/// carries its own ready-made error response.
pub type BatchEntry = Result<ParsedMessage, JsonRpcError>;

/// Everything a request body can contain
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    Single(ParsedMessage),
    Batch(Vec<BatchEntry>),
}

impl ParsedPayload {
    pub fn is_batch(&self) -> bool {
        matches!(self, ParsedPayload::Batch(_))
    }
}

/// Parse a raw body into a single message or a batch.
///
/// A top-level failure is returned as `Err` with an error response ready to
/// send. Inside a batch, failures stay attached to their entry.
pub fn parse(bytes: &[u8]) -> Result<ParsedPayload, JsonRpcError> {
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());

    if first == Some(&b'[') {
        let elements: Vec<Value> = serde_json::from_slice(bytes)
            .map_err(|e| JsonRpcError::parse_error(e.to_string()))?;
        let entries = elements.into_iter().map(parse_value).collect();
        return Ok(ParsedPayload::Batch(entries));
    }

    parse_single(bytes).map(ParsedPayload::Single)
}

/// Parse exactly one message; a JSON array is rejected as an invalid request.
pub fn parse_single(bytes: &[u8]) -> Result<ParsedMessage, JsonRpcError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| JsonRpcError::parse_error(e.to_string()))?;
    parse_value(value)
}

/// Validate an already-decoded JSON value as a single message.
pub fn parse_value(value: Value) -> Result<ParsedMessage, JsonRpcError> {
    let Value::Object(mut obj) = value else {
        return Err(JsonRpcError::invalid_request(
            RequestId::Null,
            "message must be a JSON object",
        ));
    };

    // Used for error responses only; an unusable id falls back to null
    let echo_id = obj
        .get("id")
        .and_then(RequestId::from_value)
        .unwrap_or(RequestId::Null);

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == crate::JSONRPC_VERSION => {}
        _ => {
            return Err(JsonRpcError::invalid_request(
                echo_id,
                "jsonrpc field must be '2.0'",
            ));
        }
    }

    let method = match obj.remove("method") {
        Some(Value::String(m)) if !m.is_empty() => m,
        Some(Value::String(_)) | None => {
            return Err(JsonRpcError::invalid_request(echo_id, "method field is required"));
        }
        Some(_) => {
            return Err(JsonRpcError::invalid_request(
                echo_id,
                "method field must be a string",
            ));
        }
    };

    let params = take_params(&mut obj);

    match obj.remove("id") {
        Some(raw_id) => {
            let id = RequestId::from_value(&raw_id)
                .ok_or_else(|| JsonRpcError::invalid_request(RequestId::Null, "Invalid ID field"))?;
            Ok(ParsedMessage::Request(JsonRpcRequest::new(id, method, params)))
        }
        None => Ok(ParsedMessage::Notification(JsonRpcNotification::new(method, params))),
    }
}

fn take_params(obj: &mut Map<String, Value>) -> Option<Value> {
    obj.remove("params").filter(|p| !p.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(input: &str) -> ParsedMessage {
        match parse(input.as_bytes()).unwrap() {
            ParsedPayload::Single(message) => message,
            other => panic!("expected single message, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_valid_request() {
        let message = single(r#"{"jsonrpc":"2.0","method":"add","params":{"a":15,"b":25},"id":1}"#);

        let ParsedMessage::Request(request) = message else {
            panic!("expected request");
        };
        assert_eq!(request.method, "add");
        assert_eq!(request.params, Some(json!({"a": 15, "b": 25})));
        assert_eq!(request.id, RequestId::from(1));
    }

    #[test]
    fn test_parse_valid_notification() {
        let message = single(r#"{"jsonrpc": "2.0", "method": "notify"}"#);

        assert!(message.is_notification());
        assert_eq!(message.method(), "notify");
        assert_eq!(message.request_id(), None);
    }

    #[test]
    fn test_explicit_null_id_is_request() {
        let message = single(r#"{"jsonrpc":"2.0","method":"ping","id":null}"#);
        assert!(message.is_request());
        assert_eq!(message.request_id(), Some(&RequestId::Null));
    }

    #[test]
    fn test_params_pass_through_unmodified() {
        for params in [json!([1, "two", null]), json!("scalar"), json!(7.25), json!({"nested": {"x": []}})] {
            let body = json!({"jsonrpc": "2.0", "method": "m", "params": params.clone(), "id": "x"});
            let message = parse_value(body).unwrap();
            let ParsedMessage::Request(request) = message else {
                panic!("expected request");
            };
            assert_eq!(request.params, Some(params));
        }
    }

    #[test]
    fn test_null_params_treated_as_absent() {
        let message = single(r#"{"jsonrpc":"2.0","method":"getInfo","params":null,"id":5}"#);
        let ParsedMessage::Request(request) = message else {
            panic!("expected request");
        };
        assert!(request.params.is_none());
    }

    #[test]
    fn test_leading_whitespace_before_batch() {
        let payload = parse(b" \n\t[{\"jsonrpc\":\"2.0\",\"method\":\"a\",\"id\":1}]").unwrap();
        assert!(payload.is_batch());
    }

    #[test]
    fn test_parse_invalid_json() {
        let error = parse(br#"{"jsonrpc": "2.0", "method": "test""#).unwrap_err();

        assert_eq!(error.code(), -32700);
        assert_eq!(error.id, RequestId::Null);
        assert!(error.error.data.as_ref().is_some_and(|d| d.is_string()));
    }

    #[test]
    fn test_parse_invalid_version() {
        let error = parse(br#"{"jsonrpc":"1.0","method":"add","id":3}"#).unwrap_err();

        assert_eq!(error.code(), -32600);
        assert_eq!(error.id, RequestId::from(3));
        assert_eq!(error.error.data, Some(json!("jsonrpc field must be '2.0'")));
    }

    #[test]
    fn test_missing_version_is_invalid() {
        let error = parse(br#"{"method":"add","id":3}"#).unwrap_err();
        assert_eq!(error.code(), -32600);
    }

    #[test]
    fn test_empty_or_missing_method_is_invalid() {
        for body in [
            r#"{"jsonrpc":"2.0","method":"","id":1}"#,
            r#"{"jsonrpc":"2.0","id":1}"#,
            r#"{"jsonrpc":"2.0","method":12,"id":1}"#,
        ] {
            let error = parse(body.as_bytes()).unwrap_err();
            assert_eq!(error.code(), -32600, "body: {}", body);
            assert_eq!(error.id, RequestId::from(1));
        }
    }

    #[test]
    fn test_invalid_id_type() {
        let error = parse(br#"{"jsonrpc":"2.0","method":"add","id":{"x":1}}"#).unwrap_err();
        assert_eq!(error.code(), -32600);
        assert_eq!(error.id, RequestId::Null);
        assert_eq!(error.error.data, Some(json!("Invalid ID field")));
    }

    #[test]
    fn test_non_object_message_is_invalid_request() {
        let error = parse(b"42").unwrap_err();
        assert_eq!(error.code(), -32600);
        assert_eq!(error.id, RequestId::Null);
    }

    #[test]
    fn test_batch_isolates_element_failures() {
        let body = r#"[
            {"jsonrpc":"2.0","method":"add","params":{"a":1,"b":2},"id":1},
            {"jsonrpc":"1.0","method":"add","id":2},
            7,
            {"jsonrpc":"2.0","method":"log","params":{"message":"hi"}}
        ]"#;

        let ParsedPayload::Batch(entries) = parse(body.as_bytes()).unwrap() else {
            panic!("expected batch");
        };
        assert_eq!(entries.len(), 4);
        assert!(entries[0].as_ref().is_ok_and(ParsedMessage::is_request));
        assert_eq!(entries[1].as_ref().unwrap_err().id, RequestId::from(2));
        assert_eq!(entries[2].as_ref().unwrap_err().code(), -32600);
        assert!(entries[3].as_ref().is_ok_and(ParsedMessage::is_notification));
    }

    #[test]
    fn test_malformed_batch_is_parse_error() {
        let error = parse(br#"[{"jsonrpc":"2.0","method":"add","id":1},"#).unwrap_err();
        assert_eq!(error.code(), -32700);
        assert_eq!(error.id, RequestId::Null);
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(parse(b"[]").unwrap(), ParsedPayload::Batch(vec![]));
    }
}
