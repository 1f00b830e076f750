//! # Construct Bridge
//!
//! Wires the JSON-RPC service, the key-value cache and a stdio transport
//! into the process the palette talks to.

pub mod config;
pub mod transport;

use std::sync::Arc;

use construct_json_rpc_server::{BoundArgs, MethodDef, RegistrationError, Service};
use construct_kv::{InMemoryKvStore, register_kv_methods};

pub use config::{Args, BridgeConfig};
pub use transport::{ServeStats, serve, spawn_sweeper};

/// Protocol version reported by `get_version`; the palette checks it
/// before using newer methods.
pub const BRIDGE_VERSION: i64 = 4;

/// Build the service exposed to the palette
pub fn build_service(
    config: &BridgeConfig,
    store: Arc<InMemoryKvStore>,
) -> Result<Service, RegistrationError> {
    let mut service = Service::new(config.name.clone());
    if let Some(description) = &config.description {
        service = service.with_description(description.clone());
    }
    if let Some(url) = &config.url {
        service = service.with_url(url.clone());
    }

    service.register(
        MethodDef::new("get_version").doc("Bridge protocol version."),
        |_: BoundArgs| Ok(BRIDGE_VERSION),
    )?;
    register_kv_methods(service.registry_mut(), store)?;
    service.register_describe(
        MethodDef::new("describe").doc("Manifest of the methods this bridge exposes."),
    )?;

    Ok(service)
}
