use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{JsonRpcVersion, RequestId};

/// A JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            method: method.into(),
            params,
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(RequestId::from(1), "test_method", None);

        let json = to_string(&request).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","method":"test_method","id":1}"#);

        let parsed: JsonRpcRequest = from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_request_with_params() {
        let request = JsonRpcRequest::new(
            RequestId::from("req1"),
            "set_value",
            Some(json!({"name": "test", "value": 42})),
        );

        let json = to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","method":"set_value","params":{"name":"test","value":42},"id":"req1"}"#
        );
    }

    #[test]
    fn test_null_id_is_serialized() {
        let request = JsonRpcRequest::new(RequestId::Null, "ping", None);
        let json = to_string(&request).unwrap();
        assert!(json.contains(r#""id":null"#));
    }
}
