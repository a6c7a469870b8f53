//! Pass-through parser.

use crate::{TemplateParser, PLAIN_TEXT_PRIORITY};
use bizlog_types::{BizLogError, ParseContext};

/// Returns every template unchanged. Last resort of the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl TemplateParser for PlainTextParser {
    fn name(&self) -> &str {
        "PlainTextParser"
    }

    fn priority(&self) -> i32 {
        PLAIN_TEXT_PRIORITY
    }

    fn parse(&self, template: &str, _ctx: &ParseContext) -> Result<String, BizLogError> {
        Ok(template.to_string())
    }
}
