//! # Construct Key-Value Cache
//!
//! Key-value storage exposed to the palette UI as the `kv_*` JSON-RPC
//! method family. Values are arbitrary JSON. Reads are tracked so that
//! `cache:` entries nobody has looked at for a while can be swept away.
//!
//! ```rust
//! use std::sync::Arc;
//! use construct_json_rpc_server::Registry;
//! use construct_kv::{InMemoryKvStore, register_kv_methods};
//!
//! let mut registry: Registry = Registry::new();
//! register_kv_methods(&mut registry, Arc::new(InMemoryKvStore::new())).unwrap();
//! assert!(registry.contains("kv_get"));
//! ```

mod store;
pub use store::*;

pub mod memory;
pub mod methods;
pub mod pattern;

pub use memory::InMemoryKvStore;
pub use methods::register_kv_methods;
pub use pattern::LikePattern;
