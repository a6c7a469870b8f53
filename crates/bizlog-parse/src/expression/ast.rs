//! Compiled template representation.

use serde_json::Value;

/// A template split into literal text and embedded expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub(crate) source: String,
    pub(crate) segments: Vec<Segment>,
}

impl CompiledTemplate {
    /// Template text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Literal and expression parts, in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// One part of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

/// Equality comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `#name`
    Variable(String),
    /// `target.name` or `target?.name`
    Property {
        target: Box<Expr>,
        name: String,
        null_safe: bool,
    },
    /// `target[index]`
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// `#function(args)`
    Call { function: String, args: Vec<Expr> },
    /// `@component.method(args)`
    Component {
        component: String,
        method: String,
        args: Vec<Expr>,
    },
    Add(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `condition ? then : otherwise`
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `value ?: fallback`
    Elvis {
        value: Box<Expr>,
        fallback: Box<Expr>,
    },
}
