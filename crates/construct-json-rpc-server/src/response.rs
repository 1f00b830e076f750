use serde::Serialize;
use serde_json::Value;

use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            result,
        }
    }
}

impl<T> From<(RequestId, T)> for JsonRpcResponse
where
    T: Into<Value>,
{
    fn from((id, result): (RequestId, T)) -> Self {
        Self::new(id, result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcError;
    use serde_json::{from_str, json};

    #[test]
    fn test_result_round_trip() {
        for result in [json!(null), json!(3), json!("x"), json!({"step": [1, 2]})] {
            let response = JsonRpcResponse::new(RequestId::from(5), result.clone());
            let wire = serde_json::to_string(&response).unwrap();
            let parsed: Value = from_str(&wire).unwrap();
            assert_eq!(parsed, json!({"jsonrpc": "2.0", "id": 5, "result": result}));
        }
    }

    #[test]
    fn test_field_order_on_the_wire() {
        let wire = serde_json::to_string(&JsonRpcResponse::new(RequestId::from("a"), json!(true)))
            .unwrap();
        assert_eq!(wire, r#"{"jsonrpc":"2.0","id":"a","result":true}"#);
    }

    #[test]
    fn test_error_envelope_with_null_id() {
        let error = JsonRpcError::internal_error(None, None);
        assert!(error.id.is_none());
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal Error"}}"#
        );
    }

    #[test]
    fn test_response_from_tuple() {
        let response: JsonRpcResponse = (RequestId::from(1), json!({"test": true})).into();
        assert_eq!(response.id, RequestId::from(1));
        assert_eq!(response.result, json!({"test": true}));
    }
}
