//! Capture-time data handed to template parsers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identity of the intercepted method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Type path of the receiver, e.g. `app::UserService`.
    pub target: String,
    /// Method name.
    pub name: String,
}

impl MethodSignature {
    pub fn new(target: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.target, self.name)
    }
}

/// An error raised by the intercepted operation, captured as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrownError {
    /// Error type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Display message.
    pub message: String,
}

impl ThrownError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Capture an error value, using its type name as the kind.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Self::new(std::any::type_name::<E>(), err.to_string())
    }
}

impl fmt::Display for ThrownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Immutable snapshot of one capture, built with [`ParseContextBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseContext {
    method: MethodSignature,
    args: IndexMap<String, Value>,
    ret: Option<Value>,
    thrown: Option<ThrownError>,
    extra: IndexMap<String, Value>,
}

impl ParseContext {
    /// Create a new context builder.
    pub fn builder(method: MethodSignature) -> ParseContextBuilder {
        ParseContextBuilder::new(method)
    }

    pub fn method(&self) -> &MethodSignature {
        &self.method
    }

    /// Named arguments, in declaration order.
    pub fn args(&self) -> &IndexMap<String, Value> {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    pub fn ret(&self) -> Option<&Value> {
        self.ret.as_ref()
    }

    pub fn thrown(&self) -> Option<&ThrownError> {
        self.thrown.as_ref()
    }

    pub fn extra(&self) -> &IndexMap<String, Value> {
        &self.extra
    }
}

/// Builder for [`ParseContext`].
#[derive(Debug)]
pub struct ParseContextBuilder {
    method: MethodSignature,
    args: IndexMap<String, Value>,
    ret: Option<Value>,
    thrown: Option<ThrownError>,
    extra: IndexMap<String, Value>,
}

impl ParseContextBuilder {
    pub fn new(method: MethodSignature) -> Self {
        Self {
            method,
            args: IndexMap::new(),
            ret: None,
            thrown: None,
            extra: IndexMap::new(),
        }
    }

    /// Bind a named argument. Values that fail to serialize bind as `null`.
    pub fn arg(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.args.insert(name.into(), value);
        self
    }

    /// Bind every argument of an ordered map.
    pub fn args(mut self, args: IndexMap<String, Value>) -> Self {
        self.args.extend(args);
        self
    }

    /// Set the return value.
    pub fn ret(mut self, value: impl Serialize) -> Self {
        self.ret = serde_json::to_value(value).ok();
        self
    }

    /// Set the return value from an optional JSON value.
    pub fn ret_value(mut self, value: Option<Value>) -> Self {
        self.ret = value;
        self
    }

    /// Set the thrown error.
    pub fn thrown(mut self, thrown: Option<ThrownError>) -> Self {
        self.thrown = thrown;
        self
    }

    /// Add an extra key/value.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Build the context.
    pub fn build(self) -> ParseContext {
        ParseContext {
            method: self.method,
            args: self.args,
            ret: self.ret,
            thrown: self.thrown,
            extra: self.extra,
        }
    }
}
