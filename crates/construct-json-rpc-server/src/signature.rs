//! # Parameter signatures and argument binding
//!
//! Every registered method declares a [`Signature`]: an ordered list of
//! [`Param`] descriptors. Before a callable is invoked the dispatcher binds
//! the request's positional and named arguments against that signature,
//! filling in defaults and rejecting arity or keyword mismatches with a
//! [`BindError`]. The callable then reads its arguments from the resulting
//! [`BoundArgs`].
//!
//! Parameter kinds follow the usual ordering rules:
//!
//! ```text
//! positional-only, positional-or-named, *var-positional, named-only, **var-named
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

use crate::error::RpcError;

/// How a parameter may be supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrNamed,
    /// Collects surplus positional arguments
    VarPositional,
    NamedOnly,
    /// Collects surplus named arguments
    VarNamed,
}

impl ParamKind {
    fn accepts_position(&self) -> bool {
        matches!(self, ParamKind::PositionalOnly | ParamKind::PositionalOrNamed)
    }

    fn accepts_name(&self) -> bool {
        matches!(self, ParamKind::PositionalOrNamed | ParamKind::NamedOnly)
    }

    fn is_variadic(&self) -> bool {
        matches!(self, ParamKind::VarPositional | ParamKind::VarNamed)
    }
}

/// A single parameter descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    kind: ParamKind,
    default: Option<Value>,
}

impl Param {
    /// A required positional-or-named parameter
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOrNamed,
            default: None,
        }
    }

    /// A positional-or-named parameter with a default value
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOrNamed,
            default: Some(default.into()),
        }
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::VarPositional,
            default: None,
        }
    }

    pub fn var_named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::VarNamed,
            default: None,
        }
    }

    /// Restrict this parameter to positional passing
    pub fn positional_only(mut self) -> Self {
        self.kind = ParamKind::PositionalOnly;
        self
    }

    /// Restrict this parameter to named passing
    pub fn named_only(mut self) -> Self {
        self.kind = ParamKind::NamedOnly;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.kind.is_variadic()
    }
}

/// Ordered parameter list of a registered method
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.param(Param::required(name))
    }

    pub fn optional(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.param(Param::optional(name, default))
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Names of the non-variadic parameters, in declaration order
    pub fn arg_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| !p.kind.is_variadic())
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Check the descriptor is well formed. Called once at registration.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.params.len());
        let mut previous: Option<ParamKind> = None;
        let mut defaulted_positional: Option<&str> = None;

        for param in &self.params {
            if param.name.is_empty() {
                return Err("parameter names must not be empty".to_string());
            }
            if seen.contains(&param.name.as_str()) {
                return Err(format!("duplicate parameter '{}'", param.name));
            }
            seen.push(param.name.as_str());

            if let Some(prev) = previous {
                let repeated_variadic = prev == param.kind && param.kind.is_variadic();
                if param.kind < prev || repeated_variadic {
                    return Err(format!(
                        "parameter '{}' ({:?}) cannot follow a {:?} parameter",
                        param.name, param.kind, prev
                    ));
                }
            }
            previous = Some(param.kind);

            if param.kind.is_variadic() && param.default.is_some() {
                return Err(format!(
                    "variadic parameter '{}' cannot have a default",
                    param.name
                ));
            }

            if param.kind.accepts_position() {
                match (&param.default, defaulted_positional) {
                    (Some(_), None) => defaulted_positional = Some(param.name.as_str()),
                    (None, Some(after)) => {
                        return Err(format!(
                            "required parameter '{}' follows parameter '{}' which has a default",
                            param.name, after
                        ));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Bind caller-supplied arguments without invoking anything.
    pub fn bind(&self, positional: Vec<Value>, named: Map<String, Value>) -> Result<BoundArgs, BindError> {
        let slots: Vec<&Param> = self
            .params
            .iter()
            .filter(|p| p.kind.accepts_position())
            .collect();
        let var_positional = self.params.iter().find(|p| p.kind == ParamKind::VarPositional);
        let var_named = self.params.iter().find(|p| p.kind == ParamKind::VarNamed);

        if positional.len() > slots.len() && var_positional.is_none() {
            return Err(BindError::TooManyPositional {
                expected: slots.len(),
                given: positional.len(),
            });
        }

        let mut bound = Map::new();
        let mut rest = Vec::new();
        let mut extra = Map::new();

        for (index, value) in positional.into_iter().enumerate() {
            match slots.get(index) {
                Some(param) => {
                    bound.insert(param.name.clone(), value);
                }
                None => rest.push(value),
            }
        }

        for (key, value) in named {
            let target = self.params.iter().find(|p| p.name == key);
            match target {
                Some(param) if param.kind.accepts_name() => {
                    if bound.contains_key(&key) {
                        return Err(BindError::MultipleValues(key));
                    }
                    bound.insert(key, value);
                }
                _ if var_named.is_some() => {
                    extra.insert(key, value);
                }
                Some(param) if param.kind == ParamKind::PositionalOnly => {
                    return Err(BindError::PositionalOnlyAsNamed(key));
                }
                _ => return Err(BindError::UnexpectedNamed(key)),
            }
        }

        let mut missing_positional = Vec::new();
        let mut missing_named = Vec::new();
        for param in self.params.iter().filter(|p| !p.kind.is_variadic()) {
            if bound.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.insert(param.name.clone(), default.clone());
                }
                None if param.kind == ParamKind::NamedOnly => {
                    missing_named.push(param.name.clone())
                }
                None => missing_positional.push(param.name.clone()),
            }
        }
        if !missing_positional.is_empty() {
            return Err(BindError::MissingPositional(missing_positional));
        }
        if !missing_named.is_empty() {
            return Err(BindError::MissingNamed(missing_named));
        }

        Ok(BoundArgs { bound, rest, extra })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(self.params.len() + 2);
        let has_var_positional = self.params.iter().any(|p| p.kind == ParamKind::VarPositional);
        let last_positional_only = self
            .params
            .iter()
            .rposition(|p| p.kind == ParamKind::PositionalOnly);
        let mut star_written = has_var_positional;

        for (index, param) in self.params.iter().enumerate() {
            if param.kind == ParamKind::NamedOnly && !star_written {
                parts.push("*".to_string());
                star_written = true;
            }
            let rendered = match (param.kind, &param.default) {
                (ParamKind::VarPositional, _) => format!("*{}", param.name),
                (ParamKind::VarNamed, _) => format!("**{}", param.name),
                (_, Some(default)) => format!("{}={}", param.name, default),
                (_, None) => param.name.clone(),
            };
            parts.push(rendered);
            if Some(index) == last_positional_only {
                parts.push("/".to_string());
            }
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// Reason a set of arguments does not fit a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    TooManyPositional { expected: usize, given: usize },
    MultipleValues(String),
    UnexpectedNamed(String),
    PositionalOnlyAsNamed(String),
    MissingPositional(Vec<String>),
    MissingNamed(Vec<String>),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::TooManyPositional { expected, given } => write!(
                f,
                "takes {} positional argument{} but {} {} given",
                expected,
                if *expected == 1 { "" } else { "s" },
                given,
                if *given == 1 { "was" } else { "were" }
            ),
            BindError::MultipleValues(name) => {
                write!(f, "got multiple values for argument '{}'", name)
            }
            BindError::UnexpectedNamed(name) => {
                write!(f, "got an unexpected keyword argument '{}'", name)
            }
            BindError::PositionalOnlyAsNamed(name) => write!(
                f,
                "got some positional-only arguments passed as keyword arguments: '{}'",
                name
            ),
            BindError::MissingPositional(names) => write!(
                f,
                "missing {} required positional argument{}: {}",
                names.len(),
                if names.len() == 1 { "" } else { "s" },
                quote_list(names)
            ),
            BindError::MissingNamed(names) => write!(
                f,
                "missing {} required keyword-only argument{}: {}",
                names.len(),
                if names.len() == 1 { "" } else { "s" },
                quote_list(names)
            ),
        }
    }
}

impl std::error::Error for BindError {}

fn quote_list(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] if head.len() == 1 => format!("{} and {}", head[0], last),
        [head @ .., last] => format!("{}, and {}", head.join(", "), last),
    }
}

/// Arguments bound against a [`Signature`], defaults already applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    bound: Map<String, Value>,
    rest: Vec<Value>,
    extra: Map<String, Value>,
}

impl BoundArgs {
    /// Raw value of a declared parameter
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.bound.get(name)
    }

    /// Deserialize a declared parameter into `T`.
    ///
    /// A value of the wrong shape becomes an Invalid Params error, so
    /// callables can simply use `?`.
    pub fn get<T>(&self, name: &str) -> Result<T, RpcError>
    where
        T: DeserializeOwned,
    {
        let value = self
            .bound
            .get(name)
            .ok_or_else(|| RpcError::invalid_params(format!("missing argument '{}'", name)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| RpcError::invalid_params(format!("invalid value for '{}': {}", name, e)))
    }

    /// Like [`BoundArgs::get`] but maps `null` to `None`
    pub fn opt<T>(&self, name: &str) -> Result<Option<T>, RpcError>
    where
        T: DeserializeOwned,
    {
        match self.bound.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    /// Surplus positional arguments collected by a var-positional parameter
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Surplus named arguments collected by a var-named parameter
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn screenshot() -> Signature {
        Signature::new()
            .optional("width", 256)
            .optional("height", 256)
            .optional("transparent", false)
            .optional("antialias", true)
    }

    #[test]
    fn test_bind_positional_fills_defaults() {
        let args = screenshot().bind(vec![json!(640)], Map::new()).unwrap();
        assert_eq!(args.get::<u32>("width").unwrap(), 640);
        assert_eq!(args.get::<u32>("height").unwrap(), 256);
        assert!(args.get::<bool>("antialias").unwrap());
    }

    #[test]
    fn test_bind_named() {
        let args = screenshot()
            .bind(vec![], named(json!({"transparent": true})))
            .unwrap();
        assert!(args.get::<bool>("transparent").unwrap());
        assert_eq!(args.get::<u32>("width").unwrap(), 256);
    }

    #[test]
    fn test_too_many_positional() {
        let sig = Signature::new().required("a").required("b");
        let err = sig
            .bind(vec![json!(1), json!(2), json!(3)], Map::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "takes 2 positional arguments but 3 were given");
    }

    #[test]
    fn test_missing_required() {
        let sig = Signature::new().required("url").required("token").optional("filename", ());
        let err = sig.bind(vec![], Map::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing 2 required positional arguments: 'url' and 'token'"
        );
    }

    #[test]
    fn test_unexpected_keyword() {
        let sig = Signature::new().required("key");
        let err = sig
            .bind(vec![], named(json!({"key": "a", "colour": "red"})))
            .unwrap_err();
        assert_eq!(err, BindError::UnexpectedNamed("colour".to_string()));
    }

    #[test]
    fn test_multiple_values() {
        let sig = Signature::new().required("a");
        let err = sig.bind(vec![json!(1)], named(json!({"a": 2}))).unwrap_err();
        assert_eq!(err, BindError::MultipleValues("a".to_string()));
    }

    #[test]
    fn test_variadics_collect_surplus() {
        let sig = Signature::new()
            .required("first")
            .param(Param::var_positional("rest"))
            .param(Param::var_named("extra"));
        let args = sig
            .bind(vec![json!(1), json!(2), json!(3)], named(json!({"x": true})))
            .unwrap();
        assert_eq!(args.get::<i64>("first").unwrap(), 1);
        assert_eq!(args.rest(), &[json!(2), json!(3)]);
        assert_eq!(args.extra().get("x"), Some(&json!(true)));
    }

    #[test]
    fn test_positional_only_and_named_only() {
        let sig = Signature::new()
            .param(Param::required("a").positional_only())
            .param(Param::required("b").named_only());

        let err = sig.bind(vec![], named(json!({"a": 1, "b": 2}))).unwrap_err();
        assert_eq!(err, BindError::PositionalOnlyAsNamed("a".to_string()));

        let err = sig.bind(vec![json!(1), json!(2)], Map::new()).unwrap_err();
        assert!(matches!(err, BindError::TooManyPositional { expected: 1, given: 2 }));

        let err = sig.bind(vec![json!(1)], Map::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing 1 required keyword-only argument: 'b'"
        );
    }

    #[test]
    fn test_validate_rejects_malformed_signatures() {
        assert!(screenshot().validate().is_ok());
        assert!(Signature::new().required("a").required("a").validate().is_err());
        assert!(Signature::new().optional("a", 1).required("b").validate().is_err());
        assert!(Signature::new()
            .param(Param::var_named("kw"))
            .required("late")
            .validate()
            .is_err());
        assert!(Signature::new()
            .param(Param::var_positional("a"))
            .param(Param::var_positional("b"))
            .validate()
            .is_err());
        // A required named-only parameter may follow defaulted positionals
        assert!(Signature::new()
            .optional("a", 1)
            .param(Param::required("b").named_only())
            .validate()
            .is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            screenshot().to_string(),
            "(width=256, height=256, transparent=false, antialias=true)"
        );
        let sig = Signature::new()
            .param(Param::required("ctx").positional_only())
            .required("url")
            .optional("content_type", ())
            .param(Param::optional("mode", "fast").named_only())
            .param(Param::var_named("extra"));
        assert_eq!(
            sig.to_string(),
            r#"(ctx, /, url, content_type=null, *, mode="fast", **extra)"#
        );
        assert_eq!(Signature::new().to_string(), "()");
    }

    #[test]
    fn test_typed_access_errors_are_invalid_params() {
        let args = Signature::new()
            .required("key")
            .bind(vec![json!(12)], Map::new())
            .unwrap();
        let err = args.get::<String>("key").unwrap_err();
        assert_eq!(err.code(), -32602);
        assert!(err.message().starts_with("invalid value for 'key'"));
        assert_eq!(args.opt::<String>("missing").unwrap(), None);
    }
}
