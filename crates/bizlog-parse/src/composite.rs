//! Priority-ordered parser chain with plain-text fallback.

use crate::{ExpressionParser, PlainTextParser, TemplateParser};
use bizlog_common_config::ParserConfig;
use bizlog_types::{BizLogError, ParseContext, LOG_TARGET};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tries the first supporting parser for each template.
///
/// Parsers are sorted by ascending priority once, at construction; parsers
/// with equal priority keep their registration order. When the chosen
/// parser fails, the raw template is returned if `fallback_to_plain` is set,
/// otherwise the failure is raised as [`BizLogError::Parser`].
pub struct CompositeParser {
    chain: Vec<Arc<dyn TemplateParser>>,
    fallback_to_plain: bool,
}

impl CompositeParser {
    pub fn new(mut parsers: Vec<Arc<dyn TemplateParser>>, fallback_to_plain: bool) -> Self {
        parsers.sort_by_key(|p| p.priority());
        Self {
            chain: parsers,
            fallback_to_plain,
        }
    }

    /// Build the default chain from configuration plus any extra parsers.
    ///
    /// The chain holds the expression parser when enabled, the extra parsers,
    /// and the plain-text parser.
    pub fn from_config(
        config: &ParserConfig,
        expression: Option<ExpressionParser>,
        extra: Vec<Arc<dyn TemplateParser>>,
    ) -> Result<Self, BizLogError> {
        let mut parsers: Vec<Arc<dyn TemplateParser>> = Vec::with_capacity(extra.len() + 2);
        if config.expression.enabled {
            let expression = match expression {
                Some(parser) => parser,
                None => ExpressionParser::from_config(&config.expression)?,
            };
            parsers.push(Arc::new(expression));
        }
        parsers.extend(extra);
        parsers.push(Arc::new(PlainTextParser));
        Ok(Self::new(parsers, config.fallback_to_plain))
    }

    /// Parser names in chain order.
    pub fn chain(&self) -> Vec<&str> {
        self.chain.iter().map(|p| p.name()).collect()
    }

    pub fn fallback_to_plain(&self) -> bool {
        self.fallback_to_plain
    }
}

impl TemplateParser for CompositeParser {
    fn name(&self) -> &str {
        "CompositeParser"
    }

    fn parse(&self, template: &str, ctx: &ParseContext) -> Result<String, BizLogError> {
        let Some(parser) = self.chain.iter().find(|p| p.supports(template)) else {
            return Ok(template.to_string());
        };

        match parser.parse(template, ctx) {
            Ok(text) => Ok(text),
            Err(e) if self.fallback_to_plain => {
                warn!(
                    target: LOG_TARGET,
                    parser = parser.name(),
                    error = %e,
                    "template parse failed, falling back to plain text"
                );
                Ok(template.to_string())
            }
            Err(e) => {
                debug!(target: LOG_TARGET, parser = parser.name(), "template parse failed");
                Err(BizLogError::Parser {
                    parser: parser.name().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
}

impl std::fmt::Debug for CompositeParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeParser")
            .field("chain", &self.chain())
            .field("fallback_to_plain", &self.fallback_to_plain)
            .finish()
    }
}
