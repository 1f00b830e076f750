//! # Transport entry point
//!
//! [`Service`] owns a [`Registry`] together with the service identity used
//! by introspection, and turns raw request bodies into reply text. It is the
//! only layer that never fails: protocol errors, application errors and
//! dispatch failures all come out as a JSON-RPC envelope (or as nothing, for
//! notifications).

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::dispatch::{self, JsonRpcMessageResult};
use crate::error::{DispatchError, MethodError, RegistrationError};
use crate::introspection::{self, ServiceDescription, ServiceInfo};
use crate::registry::{MethodDef, Registry};
use crate::request::parse_request_body;
use crate::signature::BoundArgs;

/// Last-resort reply when even an error envelope cannot be serialized
const INTERNAL_ERROR_REPLY: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal Error"}}"#;

/// A named JSON-RPC service
pub struct Service<C = ()> {
    info: ServiceInfo,
    registry: Registry<C>,
}

impl<C> Service<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ServiceInfo::new(name),
            registry: Registry::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.info.url = Some(url.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry<C> {
        &mut self.registry
    }

    /// See [`Registry::register`]
    pub fn register<F, R>(
        &mut self,
        def: impl Into<MethodDef>,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(BoundArgs) -> Result<R, MethodError> + Send + Sync + 'static,
        R: Serialize,
    {
        self.registry.register(def, handler)
    }

    /// See [`Registry::register_with_context`]
    pub fn register_with_context<F, R>(
        &mut self,
        def: impl Into<MethodDef>,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&C, BoundArgs) -> Result<R, MethodError> + Send + Sync + 'static,
        R: Serialize,
    {
        self.registry.register_with_context(def, handler)
    }

    /// Install the manifest method under `def`, describing this service
    pub fn register_describe(&mut self, def: impl Into<MethodDef>) -> Result<(), RegistrationError> {
        self.registry.register_describe(def, self.info.clone())
    }

    /// Manifest of the currently registered public methods
    pub fn describe(&self) -> ServiceDescription {
        introspection::describe(&self.registry, &self.info)
    }

    /// Dispatch an already parsed request value
    pub fn dispatch(&self, request: Value, context: &C) -> Result<JsonRpcMessageResult, DispatchError> {
        dispatch::dispatch(&self.registry, request, context)
    }

    /// Handle one raw request body, returning the reply text if any.
    ///
    /// Dispatch failures are reported as Internal Error with the request id
    /// when one was parsed.
    pub fn handle_request(&self, body: &[u8], context: &C) -> Option<String> {
        let result = match parse_request_body(body) {
            Ok(request) => match self.dispatch(request, context) {
                Ok(result) => result,
                Err(error) => {
                    warn!("Internal error while handling `{}`: {}", error.method(), error);
                    JsonRpcMessageResult::Error(error.to_json_rpc_error())
                }
            },
            Err(error) => JsonRpcMessageResult::Error(error),
        };

        result.to_json_string().unwrap_or_else(|error| {
            warn!("Failed to serialize reply: {}", error);
            Some(INTERNAL_ERROR_REPLY.to_string())
        })
    }

    pub fn handle_request_str(&self, body: &str, context: &C) -> Option<String> {
        self.handle_request(body.as_bytes(), context)
    }
}

impl<C> std::fmt::Debug for Service<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("info", &self.info)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn service() -> Service {
        let mut service = Service::new("Construct").with_description("Palette bridge");
        service
            .register(MethodDef::new("echo").required("a").required("b"), |args: BoundArgs| {
                Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)
            })
            .unwrap();
        service
            .register("fail", |_: BoundArgs| -> Result<(), MethodError> {
                Err(MethodError::failed("disk on fire"))
            })
            .unwrap();
        service
    }

    fn reply(service: &Service, body: &str) -> Value {
        let text = service.handle_request_str(body, &()).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let service = service();
        assert_eq!(
            reply(&service, r#"{"jsonrpc":"2.0","method":"echo","params":[1,2],"id":7}"#),
            json!({"jsonrpc": "2.0", "id": 7, "result": 3})
        );
    }

    #[test]
    fn test_parse_error() {
        let service = service();
        let value = reply(&service, r#"{"jsonrpc":"2.0","method":"echo""#);
        assert_eq!(value["id"], json!(null));
        assert_eq!(value["error"]["code"], json!(-32700));
    }

    #[test]
    #[traced_test]
    fn test_handler_failure_becomes_internal_error() {
        let service = service();
        assert_eq!(
            reply(&service, r#"{"jsonrpc":"2.0","method":"fail","id":"k"}"#),
            json!({
                "jsonrpc": "2.0",
                "id": "k",
                "error": {"code": -32603, "message": "disk on fire"}
            })
        );
        assert!(logs_contain("Internal error while handling `fail`"));
    }

    #[test]
    fn test_notification_produces_nothing() {
        let service = service();
        assert!(service
            .handle_request_str(r#"{"jsonrpc":"2.0","method":"echo","params":[1,2]}"#, &())
            .is_none());
    }

    #[test]
    fn test_service_describe() {
        let service = service();
        let manifest = service.describe();
        assert_eq!(manifest.name, "Construct");
        assert_eq!(manifest.description, "Palette bridge");
        assert_eq!(manifest.methods.len(), 2);
        assert_eq!(manifest.methods[0].invocation, "echo(a, b)");
    }
}
