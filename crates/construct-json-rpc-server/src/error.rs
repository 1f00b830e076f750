use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId};

/// Boxed error returned by callables for failures that are not RPC errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Application-defined code, outside the reserved range
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid parameters number or format",
            JsonRpcErrorCode::InternalError => "Internal Error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Whether `code` lies in the range JSON-RPC reserves for itself.
    pub fn is_reserved(code: i64) -> bool {
        (error_codes::RESERVED_START..=error_codes::RESERVED_END).contains(&code)
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(diagnostic: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::ParseError,
            Some(format!("Server received invalid JSON: {}", diagnostic)),
            None,
        )
    }

    pub fn invalid_request(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidRequest,
            Some(message.to_string()),
            None,
        )
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method not found `{}`", method)),
            None,
        )
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, None, data)
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }
}

/// JSON-RPC error envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            error,
        }
    }

    pub fn parse_error(diagnostic: &str) -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error(diagnostic))
    }

    pub fn invalid_request(id: Option<RequestId>, message: &str) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(message))
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::method_not_found(method))
    }

    pub fn invalid_params(id: RequestId, diagnostic: &str) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorObject::invalid_params(Some(Value::String(diagnostic.to_string()))),
        )
    }

    pub fn internal_error(id: Option<RequestId>, message: Option<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error(message))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Error raised by a callable that is passed through to the client verbatim.
///
/// Application code builds one with [`RpcError::new`], which refuses codes in
/// the reserved `[-32768, -32000]` range. The crate-level constructors
/// ([`RpcError::invalid_params`], [`RpcError::internal`]) are the only way to
/// raise a reserved code from inside a callable.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Result<Self, RegistrationError> {
        if JsonRpcErrorCode::is_reserved(code) {
            return Err(RegistrationError::ReservedCode(code));
        }
        Ok(Self {
            code,
            message: message.into(),
            data: None,
        })
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Invalid parameters detected by the callable itself (e.g. a wrong type).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: error_codes::INVALID_PARAMS,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: error_codes::INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.code,
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }
}

/// Programming errors raised while building a registry. Never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Method `{0}` already registered.")]
    DuplicateMethod(String),

    #[error("Codes between -32768 and -32000 are reserved for internal use only (got {0})")]
    ReservedCode(i64),

    #[error("Invalid signature for method `{method}`: {reason}")]
    InvalidSignature { method: String, reason: String },
}

/// Error type returned by registered callables.
#[derive(Debug, Error)]
pub enum MethodError {
    /// Translated into an error envelope with the error's own code, message and data
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Any other failure; surfaces as an Internal Error at the transport boundary
    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl MethodError {
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        MethodError::Failed(error.into())
    }
}

/// Failures that escape the dispatcher and are folded into an Internal Error
/// by [`crate::Service::handle_request`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{source}")]
    Handler {
        id: Option<RequestId>,
        method: String,
        #[source]
        source: BoxError,
    },

    #[error("{source}")]
    Serialization {
        id: Option<RequestId>,
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("method `{method}` panicked: {message}")]
    Panic {
        id: Option<RequestId>,
        method: String,
        message: String,
    },
}

impl DispatchError {
    /// Id of the request being dispatched when the failure happened.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            DispatchError::Handler { id, .. }
            | DispatchError::Serialization { id, .. }
            | DispatchError::Panic { id, .. } => id.as_ref(),
        }
    }

    pub fn method(&self) -> &str {
        match self {
            DispatchError::Handler { method, .. }
            | DispatchError::Serialization { method, .. }
            | DispatchError::Panic { method, .. } => method,
        }
    }

    pub fn to_json_rpc_error(&self) -> JsonRpcError {
        JsonRpcError::internal_error(self.id().cloned(), Some(self.to_string()))
    }
}
