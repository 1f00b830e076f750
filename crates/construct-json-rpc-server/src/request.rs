use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::JsonRpcError;

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Shape a raw `params` member.
    ///
    /// `null`, `[]` and `{}` all mean "no arguments". Scalars are not valid
    /// params; the error is the Invalid Request message to report.
    pub fn from_value(value: Value) -> Result<Option<Self>, &'static str> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) if items.is_empty() => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Array(items) => Ok(Some(RequestParams::Array(items))),
            Value::Object(map) => Ok(Some(RequestParams::Object(map))),
            _ => Err("`params` must be an array or an object"),
        }
    }

    /// Split into positional and named arguments
    pub fn into_parts(self) -> (Vec<Value>, Map<String, Value>) {
        match self {
            RequestParams::Array(items) => (items, Map::new()),
            RequestParams::Object(map) => (Vec::new(), map),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestParams::Object(map) => map.is_empty(),
            RequestParams::Array(vec) => vec.is_empty(),
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// Parse a raw request body into a JSON value.
///
/// Invalid JSON becomes a Parse Error envelope carrying the parser's
/// diagnostic.
pub fn parse_request_body(body: &[u8]) -> Result<Value, JsonRpcError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Parse error: {}", e);
        JsonRpcError::parse_error(&e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_shaping() {
        assert_eq!(RequestParams::from_value(json!(null)), Ok(None));
        assert_eq!(RequestParams::from_value(json!([])), Ok(None));
        assert_eq!(RequestParams::from_value(json!({})), Ok(None));
        assert_eq!(
            RequestParams::from_value(json!([1, 2])),
            Ok(Some(RequestParams::Array(vec![json!(1), json!(2)])))
        );
        assert!(RequestParams::from_value(json!("oops")).is_err());
        assert!(RequestParams::from_value(json!(3)).is_err());
    }

    #[test]
    fn test_into_parts() {
        let (positional, named) = RequestParams::from_value(json!({"key": "token"}))
            .unwrap()
            .unwrap()
            .into_parts();
        assert!(positional.is_empty());
        assert_eq!(named.get("key"), Some(&json!("token")));
    }

    #[test]
    fn test_parse_request_body() {
        let value = parse_request_body(br#"{"jsonrpc": "2.0", "method": "x"}"#).unwrap();
        assert_eq!(value["method"], json!("x"));

        let error = parse_request_body(br#"{"jsonrpc": "2.0", "method": "#).unwrap_err();
        assert_eq!(error.error.code, -32700);
        assert!(error.id.is_none());
        assert!(error.error.message.starts_with("Server received invalid JSON: "));

        let error = parse_request_body(b"\xff\xfe").unwrap_err();
        assert_eq!(error.error.code, -32700);
    }
}
