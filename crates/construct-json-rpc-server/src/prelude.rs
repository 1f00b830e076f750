//! Commonly used types for building and serving a method registry.
//!
//! ```rust
//! use construct_json_rpc_server::prelude::*;
//! ```

pub use crate::error::{DispatchError, MethodError, RegistrationError, RpcError};
pub use crate::introspection::ServiceInfo;
pub use crate::registry::{MethodDef, Registry};
pub use crate::request::RequestParams;
pub use crate::response::JsonRpcResponse;
pub use crate::service::Service;
pub use crate::signature::{BoundArgs, Param, Signature};
pub use crate::types::RequestId;

pub use crate::error_codes::*;
