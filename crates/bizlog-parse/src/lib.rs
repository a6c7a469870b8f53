//! Template parsing for the biz-log pipeline.
//!
//! A template is rendered by the first [`TemplateParser`] in a
//! [`CompositeParser`] that supports it. Parsers are ordered by ascending
//! [`TemplateParser::priority`]; the [`PlainTextParser`] sorts last and
//! returns templates unchanged.

use bizlog_types::{BizLogError, ParseContext};

pub mod composite;
pub mod expression;
pub mod plain;

pub use composite::CompositeParser;
pub use expression::{
    CacheStats, Component, ComponentRegistry, ComponentResolver, ExpressionCache,
    ExpressionParser, Scope, ScopeExtension,
};
pub use plain::PlainTextParser;

/// Priority of the expression parser.
pub const EXPRESSION_PRIORITY: i32 = 1;

/// Priority of the plain-text parser; always sorts last.
pub const PLAIN_TEXT_PRIORITY: i32 = i32::MAX;

/// A template rendering strategy.
pub trait TemplateParser: Send + Sync {
    /// Name used in diagnostics and wrapped errors.
    fn name(&self) -> &str;

    /// Position in the chain; lower runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether this parser understands the template.
    fn supports(&self, _template: &str) -> bool {
        true
    }

    /// Render the template against the context.
    fn parse(&self, template: &str, ctx: &ParseContext) -> Result<String, BizLogError>;
}
