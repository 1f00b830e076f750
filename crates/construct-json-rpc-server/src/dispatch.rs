//! # Request dispatch
//!
//! Turns one parsed request value into an outcome by walking a fixed,
//! forward-only sequence of checks:
//!
//! 1. envelope shape and `id`
//! 2. `jsonrpc` version
//! 3. `method` presence
//! 4. method resolution
//! 5. params shaping
//! 6. argument binding
//! 7. invocation
//!
//! A failure in steps 2 to 6 produces an error envelope when the request has an
//! id and nothing at all when it is a notification. Application errors raised
//! during invocation always produce an envelope. Any other invocation failure
//! (handler error, unserializable result, panic) leaves the dispatcher as a
//! [`DispatchError`] for the transport entry point to fold into an Internal
//! Error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::debug;

use crate::JSONRPC_VERSION;
use crate::error::{DispatchError, JsonRpcError, MethodError};
use crate::registry::{CallError, Registry};
use crate::request::RequestParams;
use crate::response::JsonRpcResponse;
use crate::types::RequestId;

/// Result of dispatching a single request
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessageResult {
    /// A response to a request
    Response(JsonRpcResponse),
    /// An error response
    Error(JsonRpcError),
    /// No response needed (notification)
    NoResponse,
}

impl JsonRpcMessageResult {
    /// Serialize to wire JSON if there is a response to send
    pub fn to_json_string(&self) -> Result<Option<String>, serde_json::Error> {
        match self {
            JsonRpcMessageResult::Response(response) => serde_json::to_string(response).map(Some),
            JsonRpcMessageResult::Error(error) => serde_json::to_string(error).map(Some),
            JsonRpcMessageResult::NoResponse => Ok(None),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessageResult::Error(_))
    }

    pub fn needs_response(&self) -> bool {
        !matches!(self, JsonRpcMessageResult::NoResponse)
    }
}

impl From<JsonRpcError> for JsonRpcMessageResult {
    fn from(error: JsonRpcError) -> Self {
        JsonRpcMessageResult::Error(error)
    }
}

/// Answer with `error` when the request has an id, stay silent otherwise
fn reject<F>(id: Option<RequestId>, error: F) -> JsonRpcMessageResult
where
    F: FnOnce(RequestId) -> JsonRpcError,
{
    match id {
        Some(id) => JsonRpcMessageResult::Error(error(id)),
        None => JsonRpcMessageResult::NoResponse,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Dispatch one request value against `registry`.
pub fn dispatch<C>(
    registry: &Registry<C>,
    request: Value,
    context: &C,
) -> Result<JsonRpcMessageResult, DispatchError> {
    let Value::Object(mut request) = request else {
        debug!("Request payload is not a JSON object");
        return Ok(JsonRpcError::invalid_request(None, "Request must be a JSON object").into());
    };

    let id = match request.get("id").map(RequestId::from_value) {
        None => None,
        Some(Ok(id)) => id,
        Some(Err(message)) => {
            debug!("Rejecting request with invalid id");
            return Ok(JsonRpcError::invalid_request(None, message).into());
        }
    };
    debug!("Dispatching request ID: {:?}", id);

    match request.get("jsonrpc") {
        None => {
            debug!("Missing `jsonrpc` key in request payload");
            return Ok(reject(id, |id| {
                JsonRpcError::invalid_request(Some(id), "Missing `jsonrpc` key in request object")
            }));
        }
        Some(version) if version.as_str() != Some(JSONRPC_VERSION) => {
            debug!("Requested unsupported JSON-RPC version: {}", version);
            return Ok(reject(id, |id| {
                JsonRpcError::invalid_request(
                    Some(id),
                    "Server supports only version 2.0 of the JSON-RPC protocol",
                )
            }));
        }
        Some(_) => {}
    }

    let method = match request.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => {
            debug!("Non-string `method` in request payload");
            return Ok(reject(id, |id| {
                JsonRpcError::invalid_request(Some(id), "`method` must be a string")
            }));
        }
        None => {
            debug!("Missing `method` key in request payload");
            return Ok(reject(id, |id| {
                JsonRpcError::invalid_request(Some(id), "Missing `method` key in request object")
            }));
        }
    };

    debug!("Calling method `{}`", method);
    let Some(entry) = registry.lookup(&method) else {
        debug!("Method not found: `{}`", method);
        return Ok(reject(id, |id| JsonRpcError::method_not_found(id, &method)));
    };

    let params = match request.remove("params").map(RequestParams::from_value) {
        None => None,
        Some(Ok(params)) => params,
        Some(Err(message)) => {
            debug!("Unusable `params` for `{}`", method);
            return Ok(reject(id, |id| JsonRpcError::invalid_request(Some(id), message)));
        }
    };
    let (positional, named) = match params {
        Some(RequestParams::Object(map)) => {
            debug!("Assuming params as a dictionary-like object");
            (Vec::new(), map)
        }
        Some(params) => {
            debug!("Assuming params as a list-like object");
            params.into_parts()
        }
        None => Default::default(),
    };

    let args = match entry.signature().bind(positional, named) {
        Ok(args) => args,
        Err(bind_error) => {
            debug!("Invalid method parameters: {}", bind_error);
            let diagnostic = format!("{}() {}", method, bind_error);
            return Ok(reject(id, |id| JsonRpcError::invalid_params(id, &diagnostic)));
        }
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        entry.invoke(registry, context, args)
    }));

    match outcome {
        Ok(Ok(result)) => Ok(match id {
            Some(id) => JsonRpcMessageResult::Response(JsonRpcResponse::new(id, result)),
            None => JsonRpcMessageResult::NoResponse,
        }),
        Ok(Err(CallError::Method(MethodError::Rpc(error)))) => {
            debug!("Method `{}` raised RPC error {}", method, error.code());
            Ok(JsonRpcError::new(id, error.to_error_object()).into())
        }
        Ok(Err(CallError::Method(MethodError::Failed(source)))) => {
            Err(DispatchError::Handler { id, method, source })
        }
        // A notification's result is never serialized, so it cannot fail to serialize
        Ok(Err(CallError::Serialize(_))) if id.is_none() => Ok(JsonRpcMessageResult::NoResponse),
        Ok(Err(CallError::Serialize(source))) => {
            Err(DispatchError::Serialization { id, method, source })
        }
        Err(payload) => Err(DispatchError::Panic {
            id,
            method,
            message: panic_message(payload.as_ref()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::registry::MethodDef;
    use crate::signature::BoundArgs;
    use serde_json::json;

    fn registry() -> Registry<&'static str> {
        let mut registry = Registry::new();
        registry
            .register(MethodDef::new("echo").required("a").required("b"), |args: BoundArgs| {
                Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)
            })
            .unwrap();
        registry
            .register_with_context(
                MethodDef::new("greet").optional("greeting", "hello"),
                |ctx: &&'static str, args: BoundArgs| {
                    Ok(format!("{} {}", args.get::<String>("greeting")?, ctx))
                },
            )
            .unwrap();
        registry
            .register("refuse", |_: BoundArgs| -> Result<(), MethodError> {
                Err(RpcError::new(1001, "model is locked")
                    .unwrap()
                    .with_data(json!({"doc": "bracket"}))
                    .into())
            })
            .unwrap();
        registry
            .register("explode", |_: BoundArgs| -> Result<(), MethodError> {
                panic!("viewport gone")
            })
            .unwrap();
        registry
    }

    fn run(request: Value) -> JsonRpcMessageResult {
        dispatch(&registry(), request, &"palette").unwrap()
    }

    #[test]
    fn test_positional_call() {
        let result = run(json!({"jsonrpc": "2.0", "method": "echo", "params": [1, 2], "id": 7}));
        assert_eq!(
            result,
            JsonRpcMessageResult::Response(JsonRpcResponse::new(RequestId::from(7), json!(3)))
        );
    }

    #[test]
    fn test_named_call() {
        let result = run(json!({"jsonrpc": "2.0", "method": "echo", "params": {"b": 5, "a": 1}, "id": "x"}));
        let JsonRpcMessageResult::Response(response) = result else {
            panic!("expected response, got {:?}", result);
        };
        assert_eq!(response.id, RequestId::from("x"));
        assert_eq!(response.result, json!(6));
    }

    #[test]
    fn test_context_is_threaded_first() {
        let result = run(json!({"jsonrpc": "2.0", "method": "greet", "params": ["hi"], "id": 1}));
        let JsonRpcMessageResult::Response(response) = result else {
            panic!("expected response, got {:?}", result);
        };
        assert_eq!(response.result, json!("hi palette"));
    }

    #[test]
    fn test_wrong_version_and_missing_fields() {
        let result = run(json!({"jsonrpc": "1.0", "method": "echo", "id": 7}));
        let JsonRpcMessageResult::Error(error) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert_eq!(error.error.code, -32600);
        assert_eq!(error.id, Some(RequestId::from(7)));

        let result = run(json!({"method": "missing", "id": 1}));
        assert!(result.is_error());

        let result = run(json!({"jsonrpc": "2.0", "id": 1}));
        let JsonRpcMessageResult::Error(error) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert_eq!(error.error.message, "Missing `method` key in request object");
    }

    #[test]
    fn test_notification_failures_are_silent() {
        for request in [
            json!({"jsonrpc": "1.0", "method": "echo"}),
            json!({"method": "echo"}),
            json!({"jsonrpc": "2.0"}),
            json!({"jsonrpc": "2.0", "method": "nope"}),
            json!({"jsonrpc": "2.0", "method": "echo", "params": [1]}),
            json!({"jsonrpc": "2.0", "method": "echo", "params": 5, "id": null}),
        ] {
            assert_eq!(run(request), JsonRpcMessageResult::NoResponse);
        }
    }

    #[test]
    fn test_successful_notification_is_silent() {
        let result = run(json!({"jsonrpc": "2.0", "method": "echo", "params": [1, 2]}));
        assert!(!result.needs_response());
    }

    #[test]
    fn test_method_not_found() {
        let result = run(json!({"jsonrpc": "2.0", "method": "foo", "id": 9}));
        let JsonRpcMessageResult::Error(error) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert_eq!(error.error.code, -32601);
        assert_eq!(error.error.message, "Method not found `foo`");
    }

    #[test]
    fn test_invalid_params_carries_diagnostic() {
        let result = run(json!({"jsonrpc": "2.0", "method": "echo", "params": [1, 2, 3], "id": 2}));
        let JsonRpcMessageResult::Error(error) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert_eq!(error.error.code, -32602);
        assert_eq!(error.error.message, "Invalid parameters number or format");
        assert_eq!(
            error.error.data,
            Some(json!("echo() takes 2 positional arguments but 3 were given"))
        );
    }

    #[test]
    fn test_application_error_passes_through() {
        let result = run(json!({"jsonrpc": "2.0", "method": "refuse", "id": 3}));
        let JsonRpcMessageResult::Error(error) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert_eq!(error.error.code, 1001);
        assert_eq!(error.error.message, "model is locked");
        assert_eq!(error.error.data, Some(json!({"doc": "bracket"})));
    }

    #[test]
    fn test_application_error_from_notification_still_responds() {
        let result = run(json!({"jsonrpc": "2.0", "method": "refuse"}));
        let JsonRpcMessageResult::Error(error) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert!(error.id.is_none());
    }

    #[test]
    fn test_panic_becomes_dispatch_error() {
        let error = dispatch(
            &registry(),
            json!({"jsonrpc": "2.0", "method": "explode", "id": 4}),
            &"palette",
        )
        .unwrap_err();
        assert_eq!(error.id(), Some(&RequestId::from(4)));
        assert_eq!(error.to_string(), "method `explode` panicked: viewport gone");
    }

    #[test]
    fn test_non_object_request() {
        let result = run(json!([{"jsonrpc": "2.0", "method": "echo", "id": 1}]));
        let JsonRpcMessageResult::Error(error) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert_eq!(error.error.code, -32600);
        assert!(error.id.is_none());
    }

    #[test]
    fn test_falsy_ids_are_still_requests() {
        let result = run(json!({"jsonrpc": "2.0", "method": "echo", "params": [0, 0], "id": 0}));
        assert_eq!(
            result,
            JsonRpcMessageResult::Response(JsonRpcResponse::new(RequestId::from(0), json!(0)))
        );
    }
}
