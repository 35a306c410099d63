//! JSON-RPC 2.0 wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request method name. For tool servers this is the tool name.
    pub method: String,
    /// Request parameters.
    pub params: Map<String, Value>,
    /// Request ID.
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Map<String, Value>, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: RequestId::Number(id),
        }
    }
}

/// JSON-RPC request ID.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric ID.
    Number(u64),
    /// String ID.
    String(String),
}

/// JSON-RPC response.
///
/// `result` keeps a present `null` distinct from a missing key, since a tool
/// may legitimately return `null`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version. Lenient servers omit it.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Response result (success case).
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Response error (error case).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request ID this response corresponds to.
    #[serde(default)]
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    /// Check if this response is an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Get the result value, if present.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}

// Only called when the key exists, so `null` becomes `Some(Value::Null)`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC error object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_rpc_request_serialization() {
        let Value::Object(params) = json!({"key": "value"}) else {
            unreachable!()
        };
        let request = JsonRpcRequest::new("create_entities", params, 7);

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            json,
            json!({
                "jsonrpc": "2.0",
                "method": "create_entities",
                "params": {"key": "value"},
                "id": 7
            })
        );
    }

    #[test]
    fn test_response_with_result() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":{"ok":true},"id":1}"#)
                .expect("deserialize");

        assert!(!response.is_error());
        assert_eq!(response.result(), Some(&json!({"ok": true})));
        assert_eq!(response.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn test_null_result_is_present() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":null,"id":1}"#)
                .expect("deserialize");
        assert_eq!(response.result(), Some(&Value::Null));

        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).expect("deserialize");
        assert!(response.result().is_none());
    }

    #[test]
    fn test_response_with_error() {
        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":"a"}"#,
        )
        .expect("deserialize");

        assert!(response.is_error());
        assert!(response.result().is_none());
        let error = response.error.expect("error present");
        assert_eq!(error.code, -32601);
        assert_eq!(response.id, Some(RequestId::String("a".to_string())));
    }
}
