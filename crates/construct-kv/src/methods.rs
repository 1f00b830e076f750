//! `kv_*` RPC methods
//!
//! Thin adapters from bound RPC arguments to [`KvStore`] calls. Store
//! failures surface as Invalid Params when the caller sent a bad pattern
//! and as an Internal Error otherwise.

use std::sync::Arc;

use construct_json_rpc_server::{BoundArgs, MethodDef, MethodError, RegistrationError, Registry, RpcError};
use serde_json::{Map, Value};
use tracing::debug;

use crate::pattern::LikePattern;
use crate::store::{KvError, KvStore};

impl From<KvError> for MethodError {
    fn from(error: KvError) -> Self {
        match error {
            KvError::InvalidPattern(_) => RpcError::invalid_params(error.to_string()).into(),
            other => MethodError::failed(other),
        }
    }
}

fn pattern_arg(args: &BoundArgs) -> Result<Option<LikePattern>, MethodError> {
    match args.opt::<String>("pattern")? {
        // An empty pattern filters nothing, same as no pattern
        Some(pattern) if !pattern.is_empty() => Ok(Some(LikePattern::new(&pattern).map_err(KvError::from)?)),
        _ => Ok(None),
    }
}

fn keys_arg(args: &BoundArgs) -> Result<Vec<String>, MethodError> {
    Ok(args.opt::<Vec<String>>("keys")?.unwrap_or_default())
}

/// Register the `kv_*` method family on `registry`, backed by `store`.
pub fn register_kv_methods<C, S>(registry: &mut Registry<C>, store: Arc<S>) -> Result<(), RegistrationError>
where
    S: KvStore + ?Sized + 'static,
{
    let kv = Arc::clone(&store);
    registry.register(
        MethodDef::new("kv_get")
            .required("key")
            .doc("Value stored under `key`, or null."),
        move |args: BoundArgs| {
            let key: String = args.get("key")?;
            debug!("kv_get {}", key);
            Ok(kv.get(&key)?)
        },
    )?;

    let kv = Arc::clone(&store);
    registry.register(
        MethodDef::new("kv_mget")
            .optional("keys", Value::Null)
            .optional("pattern", Value::Null)
            .doc(
                "Entries for the given keys and for keys matching a LIKE pattern.

                Returns an object mapping each found key to its value.",
            ),
        move |args: BoundArgs| {
            let keys = keys_arg(&args)?;
            let pattern = pattern_arg(&args)?;
            Ok(kv.get_many(&keys, pattern.as_ref())?)
        },
    )?;

    let kv = Arc::clone(&store);
    registry.register(
        MethodDef::new("kv_keys")
            .optional("pattern", Value::Null)
            .doc("Sorted list of stored keys, optionally filtered by a LIKE pattern."),
        move |args: BoundArgs| {
            let pattern = pattern_arg(&args)?;
            Ok(kv.keys(pattern.as_ref())?)
        },
    )?;

    let kv = Arc::clone(&store);
    registry.register(
        MethodDef::new("kv_set")
            .required("key")
            .required("value")
            .doc("Store any JSON value under `key`."),
        move |args: BoundArgs| {
            let key: String = args.get("key")?;
            let value: Value = args.get("value")?;
            kv.set(&key, value)?;
            Ok(Value::Null)
        },
    )?;

    let kv = Arc::clone(&store);
    registry.register(
        MethodDef::new("kv_mset")
            .required("obj")
            .doc("Store every key/value pair of an object."),
        move |args: BoundArgs| {
            let entries: Map<String, Value> = args
                .get("obj")
                .map_err(|_| RpcError::invalid_params("kv_mset() expects `obj` to be an object"))?;
            kv.set_many(entries)?;
            Ok(Value::Null)
        },
    )?;

    let kv = Arc::clone(&store);
    registry.register(
        MethodDef::new("kv_del").required("key").doc("Remove `key`."),
        move |args: BoundArgs| {
            let key: String = args.get("key")?;
            kv.delete(&key)?;
            Ok(Value::Null)
        },
    )?;

    let kv = store;
    registry.register(
        MethodDef::new("kv_mdel")
            .optional("keys", Value::Null)
            .optional("pattern", Value::Null)
            .doc("Remove the given keys and every key matching a LIKE pattern."),
        move |args: BoundArgs| {
            let keys = keys_arg(&args)?;
            let pattern = pattern_arg(&args)?;
            let removed = kv.delete_many(&keys, pattern.as_ref())?;
            debug!("kv_mdel removed {} entries", removed);
            Ok(Value::Null)
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKvStore;

    #[test]
    fn test_registers_whole_family() {
        let mut registry: Registry = Registry::new();
        register_kv_methods(&mut registry, Arc::new(InMemoryKvStore::new())).unwrap();
        assert_eq!(
            registry.public_names(),
            vec!["kv_del", "kv_get", "kv_keys", "kv_mdel", "kv_mget", "kv_mset", "kv_set"]
        );
    }

    #[test]
    fn test_registering_twice_fails() {
        let mut registry: Registry = Registry::new();
        let store = Arc::new(InMemoryKvStore::new());
        register_kv_methods(&mut registry, Arc::clone(&store)).unwrap();
        assert!(matches!(
            register_kv_methods(&mut registry, store),
            Err(RegistrationError::DuplicateMethod(name)) if name == "kv_get"
        ));
    }

    #[test]
    fn test_invalid_pattern_is_invalid_params() {
        let error: MethodError = KvError::InvalidPattern(regex::Regex::new("(").unwrap_err()).into();
        match error {
            MethodError::Rpc(rpc) => assert_eq!(rpc.code(), -32602),
            other => panic!("expected rpc error, got {:?}", other),
        }
    }
}
