//! Expression template parser.
//!
//! Templates embed expressions between `#{` and `}`:
//!
//! ```text
//! 用户#{#operator}删除课程：#{#course?.name ?: '未知'}
//! ```
//!
//! Compiled templates are cached by their exact text. Evaluation always runs
//! against a fresh [`Scope`] built from the current [`ParseContext`], so no
//! rendered value is shared between calls.

mod ast;
mod cache;
mod compiler;
mod eval;
mod lexer;
mod scope;

pub use ast::{CompareOp, CompiledTemplate, Expr, Segment};
pub use cache::{CacheStats, ExpressionCache};
pub use compiler::compile;
pub use eval::to_text;
pub use scope::{
    Component, ComponentRegistry, ComponentResolver, ExpressionFunction, Scope, ScopeExtension,
};

use crate::{TemplateParser, EXPRESSION_PRIORITY};
use bizlog_common_config::ExpressionConfig;
use bizlog_types::{BizLogError, ParseContext, LOG_TARGET};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, trace};

/// Opening delimiter of an embedded expression.
pub const EXPRESSION_PREFIX: &str = "#{";

/// Closing delimiter of an embedded expression.
pub const EXPRESSION_SUFFIX: &str = "}";

/// Expression compile and evaluation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("compile error at offset {offset}: {message}")]
    Compile { offset: usize, message: String },

    #[error("{0}")]
    Evaluation(String),
}

/// Renders `#{...}` templates.
pub struct ExpressionParser {
    cache: ExpressionCache,
    extensions: Vec<Arc<dyn ScopeExtension>>,
    components: Option<Arc<dyn ComponentResolver>>,
}

impl ExpressionParser {
    /// Create a parser whose cache holds `cache_size` templates, each expiring
    /// `cache_ttl` after its last use.
    pub fn new(cache_size: NonZeroUsize, cache_ttl: Duration) -> Self {
        Self {
            cache: ExpressionCache::new(cache_size, cache_ttl),
            extensions: Vec::new(),
            components: None,
        }
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &ExpressionConfig) -> Result<Self, BizLogError> {
        let size = NonZeroUsize::new(config.cache_size).ok_or_else(|| {
            BizLogError::PipelineMisuse("expression cache size must be greater than 0".to_string())
        })?;
        Ok(Self::new(size, config.cache_ttl()))
    }

    /// Add a scope extension, run on every parse in registration order.
    pub fn with_extension(mut self, extension: Arc<dyn ScopeExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Set the resolver for `@component` calls.
    pub fn with_components(mut self, resolver: Arc<dyn ComponentResolver>) -> Self {
        self.components = Some(resolver);
        self
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    fn scope(&self, ctx: &ParseContext) -> Scope {
        let mut scope = Scope::from_context(ctx);
        if let Some(components) = &self.components {
            scope.set_components(Arc::clone(components));
        }
        for extension in &self.extensions {
            extension.extend(&mut scope, ctx);
        }
        scope
    }
}

impl TemplateParser for ExpressionParser {
    fn name(&self) -> &str {
        "ExpressionParser"
    }

    fn priority(&self) -> i32 {
        EXPRESSION_PRIORITY
    }

    fn supports(&self, template: &str) -> bool {
        template.contains(EXPRESSION_PREFIX)
    }

    fn parse(&self, template: &str, ctx: &ParseContext) -> Result<String, BizLogError> {
        let result = self
            .cache
            .get_or_compile(template, compile)
            .and_then(|compiled| eval::render(&compiled, &self.scope(ctx)));

        match result {
            Ok(text) => {
                trace!(target: LOG_TARGET, template, rendered = %text, "rendered expression template");
                Ok(text)
            }
            Err(e) => {
                error!(target: LOG_TARGET, template, error = %e, "expression template failed");
                Err(BizLogError::evaluation(template, e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for ExpressionParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionParser")
            .field("cache", &self.cache)
            .field("extensions", &self.extensions.len())
            .field("components", &self.components.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizlog_types::{MethodSignature, ThrownError};
    use serde_json::{json, Value};

    fn parser() -> ExpressionParser {
        ExpressionParser::new(NonZeroUsize::new(16).unwrap(), Duration::from_secs(60))
    }

    fn ctx_with_user(id: i64, name: &str) -> ParseContext {
        ParseContext::builder(MethodSignature::new("app::UserService", "delete"))
            .arg("id", id)
            .arg("user", json!({"name": name}))
            .build()
    }

    struct Greeter;

    impl Component for Greeter {
        fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, String> {
            match (method, args) {
                ("hello", [Value::String(name)]) => Ok(json!(format!("hello {}", name))),
                ("fail", _) => Err("greeter is down".to_string()),
                _ => Err(format!("no method {}", method)),
            }
        }
    }

    #[test]
    fn test_supports_only_delimited_templates() {
        let parser = parser();
        assert!(parser.supports("删除 #{#id}"));
        assert!(!parser.supports("删除 {id}"));
        assert!(!parser.supports("#id"));
    }

    #[test]
    fn test_binds_arguments_and_fixed_variables() {
        let ctx = ParseContext::builder(MethodSignature::new("app::UserService", "delete"))
            .arg("id", 42)
            .ret(json!({"ok": true}))
            .thrown(Some(ThrownError::new("NotFound", "user missing")))
            .build();

        let rendered = parser()
            .parse(
                "#{#method.signature} id=#{#id} args=#{#args} ok=#{#ret.ok} ex=#{#ex.message}",
                &ctx,
            )
            .unwrap();
        assert_eq!(
            rendered,
            "app::UserService::delete id=42 args=[42] ok=true ex=user missing"
        );
    }

    #[test]
    fn test_cache_reuses_compiled_form_without_leaking_values() {
        let parser = parser();
        let template = "删除用户#{#user.name}(#{#id})";

        let first = parser.parse(template, &ctx_with_user(1, "Ann")).unwrap();
        let second = parser.parse(template, &ctx_with_user(2, "Bob")).unwrap();

        assert_eq!(first, "删除用户Ann(1)");
        assert_eq!(second, "删除用户Bob(2)");

        let stats = parser.cache().stats();
        assert_eq!(stats.compiles, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_extensions_and_components() {
        let parser = parser()
            .with_extension(Arc::new(|scope: &mut Scope, ctx: &ParseContext| {
                scope.set_variable("tenant", json!("t-9"));
                let method = ctx.method().name.clone();
                scope.register_function("tag", move |args: &[Value]| {
                    Ok(json!(format!("{}:{}", method, to_text(&args[0]))))
                });
            }))
            .with_components(Arc::new(
                ComponentRegistry::new().with("greeter", Arc::new(Greeter)),
            ));

        let ctx = ctx_with_user(7, "Ann");
        assert_eq!(
            parser
                .parse("#{#tenant} #{#tag(#id)} #{@greeter.hello(#user.name)}", &ctx)
                .unwrap(),
            "t-9 delete:7 hello Ann"
        );

        match parser.parse("#{@greeter.fail()}", &ctx) {
            Err(BizLogError::TemplateEvaluation { template, message }) => {
                assert_eq!(template, "#{@greeter.fail()}");
                assert!(message.contains("greeter is down"));
            }
            other => panic!("expected evaluation error, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_error_is_evaluation_error() {
        let result = parser().parse("#{#id", &ctx_with_user(1, "Ann"));
        assert!(matches!(result, Err(BizLogError::TemplateEvaluation { .. })));
    }

    #[test]
    fn test_from_config_rejects_zero_cache() {
        let config = ExpressionConfig {
            cache_size: 0,
            ..ExpressionConfig::default()
        };
        assert!(matches!(
            ExpressionParser::from_config(&config),
            Err(BizLogError::PipelineMisuse(_))
        ));
    }
}
