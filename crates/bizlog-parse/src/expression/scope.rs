//! Evaluation scope and its extension points.

use bizlog_types::ParseContext;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A function callable from templates as `#name(args)`.
pub type ExpressionFunction = dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync;

/// Adds variables or functions to every evaluation scope.
///
/// Called once per parse with the capture being rendered.
pub trait ScopeExtension: Send + Sync {
    fn extend(&self, scope: &mut Scope, ctx: &ParseContext);
}

impl<F> ScopeExtension for F
where
    F: Fn(&mut Scope, &ParseContext) + Send + Sync,
{
    fn extend(&self, scope: &mut Scope, ctx: &ParseContext) {
        self(scope, ctx)
    }
}

/// A named service callable from templates as `@name.method(args)`.
pub trait Component: Send + Sync {
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, String>;
}

/// Resolves component identifiers used in `@name` expressions.
pub trait ComponentResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Component>>;
}

/// Map-backed [`ComponentResolver`].
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under a name, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, component: Arc<dyn Component>) -> &mut Self {
        self.components.insert(name.into(), component);
        self
    }

    pub fn with(mut self, name: impl Into<String>, component: Arc<dyn Component>) -> Self {
        self.register(name, component);
        self
    }
}

impl ComponentResolver for ComponentRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.get(name).cloned()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.components.keys().collect();
        names.sort();
        f.debug_struct("ComponentRegistry").field("components", &names).finish()
    }
}

/// Variables, functions and components visible to one evaluation.
///
/// A scope is built fresh for every parse and dropped afterwards.
#[derive(Default)]
pub struct Scope {
    variables: HashMap<String, Value>,
    functions: HashMap<String, Arc<ExpressionFunction>>,
    components: Option<Arc<dyn ComponentResolver>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the scope for a capture.
    ///
    /// Extra values bind first, then named arguments, then `#args`, `#ret`,
    /// `#ex` and `#method`; later bindings shadow earlier ones.
    pub fn from_context(ctx: &ParseContext) -> Self {
        let mut scope = Self::new();
        for (name, value) in ctx.extra() {
            scope.set_variable(name.clone(), value.clone());
        }
        for (name, value) in ctx.args() {
            scope.set_variable(name.clone(), value.clone());
        }
        scope.set_variable("args", Value::Array(ctx.args().values().cloned().collect()));
        scope.set_variable("ret", ctx.ret().cloned().unwrap_or(Value::Null));
        scope.set_variable(
            "ex",
            ctx.thrown()
                .and_then(|thrown| serde_json::to_value(thrown).ok())
                .unwrap_or(Value::Null),
        );
        let method = ctx.method();
        scope.set_variable(
            "method",
            json!({
                "target": method.target,
                "name": method.name,
                "signature": method.to_string(),
            }),
        );
        scope
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Register a `#name(...)` function.
    pub fn register_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<&Arc<ExpressionFunction>> {
        self.functions.get(name)
    }

    pub fn set_components(&mut self, resolver: Arc<dyn ComponentResolver>) {
        self.components = Some(resolver);
    }

    pub fn component(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.as_ref().and_then(|r| r.resolve(name))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("Scope")
            .field("variables", &self.variables)
            .field("functions", &functions)
            .field("components", &self.components.is_some())
            .finish()
    }
}
