//! # JSON-RPC 2.0 Method Service
//!
//! A synchronous, transport-agnostic JSON-RPC 2.0 server core for the
//! Construct add-in bridge. Callables are registered by name with an
//! explicit parameter [`Signature`]; raw request bodies are parsed,
//! validated, bound and dispatched, and every outcome is rendered as a
//! JSON-RPC envelope (or as nothing, for notifications).
//!
//! ## Features
//! - Named and positional parameters, defaults and variadics
//! - Optional caller context threaded into selected callables
//! - Application errors with custom codes, reserved codes guarded
//! - Service manifest (introspection) for clients
//! - No batch requests

pub mod dispatch;
pub mod error;
pub mod introspection;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod service;
pub mod signature;
pub mod types;

// Re-export main types
pub use dispatch::{JsonRpcMessageResult, dispatch};
pub use error::{
    BoxError, DispatchError, JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, MethodError,
    RegistrationError, RpcError,
};
pub use introspection::{MethodDescription, ServiceDescription, ServiceInfo, describe, trim_doc};
pub use registry::{MethodDef, MethodEntry, Registry};
pub use request::{RequestParams, parse_request_body};
pub use response::JsonRpcResponse;
pub use service::Service;
pub use signature::{BindError, BoundArgs, Param, ParamKind, Signature};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Application code may not use anything in this range
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32000;
}
