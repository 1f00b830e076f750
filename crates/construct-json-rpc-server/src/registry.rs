//! # Method Registry
//!
//! Name → callable bindings with the metadata the dispatcher needs: the
//! parameter [`Signature`], whether the callable wants the caller context,
//! and documentation text for introspection.
//!
//! A registry is filled once at startup and treated as read-only afterwards,
//! so a single instance can be shared between dispatching threads.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{MethodError, RegistrationError};
use crate::introspection::{self, ServiceInfo};
use crate::signature::{BoundArgs, Param, Signature};

/// Name of the built-in that lists public method names
pub const TRAIT_NAMES: &str = "trait_names";
/// Name of the built-in that lists (no) attribute names
pub const ATTRIBUTE_NAMES: &str = "_getAttributeNames";
/// Default name of the manifest method installed by [`Registry::register_describe`]
pub const DESCRIBE: &str = "describe";

type PlainFn = dyn Fn(BoundArgs) -> Result<Value, CallError> + Send + Sync;
type ContextFn<C> = dyn Fn(&C, BoundArgs) -> Result<Value, CallError> + Send + Sync;

/// Failure of a single invocation, before the dispatcher classifies it
#[derive(Debug)]
pub(crate) enum CallError {
    Method(MethodError),
    Serialize(serde_json::Error),
}

enum Callable<C> {
    Plain(Box<PlainFn>),
    WithContext(Box<ContextFn<C>>),
    Builtin(Builtin),
}

#[derive(Debug, Clone)]
enum Builtin {
    TraitNames,
    AttributeNames,
    Describe(Box<ServiceInfo>),
}

/// Registration descriptor: name, parameters and documentation
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    name: String,
    signature: Signature,
    doc: Option<String>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: Signature::new(),
            doc: None,
        }
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.signature = self.signature.param(param);
        self
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.param(Param::required(name))
    }

    pub fn optional(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.param(Param::optional(name, default))
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for MethodDef {
    fn from(name: &str) -> Self {
        MethodDef::new(name)
    }
}

impl From<String> for MethodDef {
    fn from(name: String) -> Self {
        MethodDef::new(name)
    }
}

/// A registered method. Immutable once stored in a [`Registry`].
pub struct MethodEntry<C> {
    name: String,
    signature: Signature,
    doc: Option<String>,
    callable: Callable<C>,
}

impl<C> MethodEntry<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Whether the caller context is threaded in ahead of the arguments
    pub fn wants_context(&self) -> bool {
        matches!(self.callable, Callable::WithContext(_))
    }

    pub(crate) fn invoke(
        &self,
        registry: &Registry<C>,
        context: &C,
        args: BoundArgs,
    ) -> Result<Value, CallError> {
        match &self.callable {
            Callable::Plain(f) => f(args),
            Callable::WithContext(f) => f(context, args),
            Callable::Builtin(Builtin::TraitNames) => Ok(Value::from(registry.public_names())),
            Callable::Builtin(Builtin::AttributeNames) => Ok(Value::Array(Vec::new())),
            Callable::Builtin(Builtin::Describe(info)) => {
                serde_json::to_value(introspection::describe(registry, info))
                    .map_err(CallError::Serialize)
            }
        }
    }
}

impl<C> fmt::Debug for MethodEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .field("wants_context", &self.wants_context())
            .finish()
    }
}

/// Method registry, generic over the caller context type `C`
pub struct Registry<C = ()> {
    methods: HashMap<String, MethodEntry<C>>,
}

impl<C> Registry<C> {
    /// Create a registry holding only the built-in helpers
    pub fn new() -> Self {
        let mut registry = Self {
            methods: HashMap::new(),
        };
        for (name, builtin) in [
            (TRAIT_NAMES, Builtin::TraitNames),
            (ATTRIBUTE_NAMES, Builtin::AttributeNames),
        ] {
            registry.methods.insert(
                name.to_string(),
                MethodEntry {
                    name: name.to_string(),
                    signature: Signature::new(),
                    doc: None,
                    callable: Callable::Builtin(builtin),
                },
            );
        }
        registry
    }

    /// Register a callable that does not need the caller context
    pub fn register<F, R>(
        &mut self,
        def: impl Into<MethodDef>,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(BoundArgs) -> Result<R, MethodError> + Send + Sync + 'static,
        R: Serialize,
    {
        let callable = Callable::Plain(Box::new(move |args: BoundArgs| {
            let result = handler(args).map_err(CallError::Method)?;
            serde_json::to_value(result).map_err(CallError::Serialize)
        }));
        self.insert(def.into(), callable)
    }

    /// Register a callable that receives the caller context first
    pub fn register_with_context<F, R>(
        &mut self,
        def: impl Into<MethodDef>,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&C, BoundArgs) -> Result<R, MethodError> + Send + Sync + 'static,
        R: Serialize,
    {
        let callable = Callable::WithContext(Box::new(move |context: &C, args: BoundArgs| {
            let result = handler(context, args).map_err(CallError::Method)?;
            serde_json::to_value(result).map_err(CallError::Serialize)
        }));
        self.insert(def.into(), callable)
    }

    /// Expose the service manifest as an RPC method.
    ///
    /// The manifest is built on every call, so methods registered later
    /// still show up in it.
    pub fn register_describe(
        &mut self,
        def: impl Into<MethodDef>,
        info: ServiceInfo,
    ) -> Result<(), RegistrationError> {
        self.insert(def.into(), Callable::Builtin(Builtin::Describe(Box::new(info))))
    }

    fn insert(&mut self, def: MethodDef, callable: Callable<C>) -> Result<(), RegistrationError> {
        if self.methods.contains_key(&def.name) {
            return Err(RegistrationError::DuplicateMethod(def.name));
        }
        def.signature
            .validate()
            .map_err(|reason| RegistrationError::InvalidSignature {
                method: def.name.clone(),
                reason,
            })?;

        debug!("Registering method `{}`{}", def.name, def.signature);
        self.methods.insert(
            def.name.clone(),
            MethodEntry {
                name: def.name,
                signature: def.signature,
                doc: def.doc,
                callable,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&MethodEntry<C>> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Methods meant for clients: no `_`-prefixed names, no `trait_names`
    pub fn list_public(&self) -> BTreeMap<&str, &MethodEntry<C>> {
        self.methods
            .iter()
            .filter(|(name, _)| is_public(name))
            .map(|(name, entry)| (name.as_str(), entry))
            .collect()
    }

    /// Sorted names of the public methods
    pub fn public_names(&self) -> Vec<String> {
        self.list_public().into_keys().map(str::to_string).collect()
    }

    /// Number of registered methods, built-ins included
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("methods", &names).finish()
    }
}

fn is_public(name: &str) -> bool {
    !name.starts_with('_') && name != TRAIT_NAMES
}
