//! Expression evaluation against a [`Scope`].

use super::ast::{CompareOp, CompiledTemplate, Expr, Segment};
use super::scope::Scope;
use super::ExpressionError;
use serde_json::{Number, Value};

/// Render a compiled template to text.
pub fn render(template: &CompiledTemplate, scope: &Scope) -> Result<String, ExpressionError> {
    let mut out = String::with_capacity(template.source.len());
    for segment in &template.segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Expr(expr) => out.push_str(&to_text(&evaluate(expr, scope)?)),
        }
    }
    Ok(out)
}

/// Text form of a value: strings verbatim, `null` empty, containers as JSON.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn eval_error(message: impl Into<String>) -> ExpressionError {
    ExpressionError::Evaluation(message.into())
}

pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => Ok(scope.variable(name).cloned().unwrap_or(Value::Null)),
        Expr::Property {
            target,
            name,
            null_safe,
        } => {
            let target = evaluate(target, scope)?;
            property(target, name, *null_safe)
        }
        Expr::Index { target, index } => {
            let target = evaluate(target, scope)?;
            let index = evaluate(index, scope)?;
            index_into(target, &index)
        }
        Expr::Call { function, args } => {
            let f = scope
                .function(function)
                .ok_or_else(|| eval_error(format!("unknown function '#{}'", function)))?;
            let args = evaluate_all(args, scope)?;
            f(&args).map_err(|e| eval_error(format!("function '#{}' failed: {}", function, e)))
        }
        Expr::Component {
            component,
            method,
            args,
        } => {
            let resolved = scope
                .component(component)
                .ok_or_else(|| eval_error(format!("unknown component '@{}'", component)))?;
            let args = evaluate_all(args, scope)?;
            resolved.invoke(method, &args).map_err(|e| {
                eval_error(format!("component '@{}.{}' failed: {}", component, method, e))
            })
        }
        Expr::Add(lhs, rhs) => {
            let lhs = evaluate(lhs, scope)?;
            let rhs = evaluate(rhs, scope)?;
            Ok(add(&lhs, &rhs))
        }
        Expr::Compare { op, lhs, rhs } => {
            let equal = values_equal(&evaluate(lhs, scope)?, &evaluate(rhs, scope)?);
            Ok(Value::Bool(match op {
                CompareOp::Eq => equal,
                CompareOp::Ne => !equal,
            }))
        }
        Expr::Ternary {
            condition,
            then,
            otherwise,
        } => match evaluate(condition, scope)? {
            Value::Bool(true) => evaluate(then, scope),
            Value::Bool(false) | Value::Null => evaluate(otherwise, scope),
            other => Err(eval_error(format!(
                "ternary condition must be a boolean, got {}",
                kind(&other)
            ))),
        },
        Expr::Elvis { value, fallback } => match evaluate(value, scope)? {
            Value::Null => evaluate(fallback, scope),
            Value::String(s) if s.is_empty() => evaluate(fallback, scope),
            other => Ok(other),
        },
    }
}

fn evaluate_all(args: &[Expr], scope: &Scope) -> Result<Vec<Value>, ExpressionError> {
    args.iter().map(|arg| evaluate(arg, scope)).collect()
}

fn property(target: Value, name: &str, null_safe: bool) -> Result<Value, ExpressionError> {
    match target {
        Value::Object(mut map) => match map.remove(name) {
            Some(value) => Ok(value),
            None if null_safe => Ok(Value::Null),
            None => Err(eval_error(format!("property '{}' not found", name))),
        },
        _ if null_safe => Ok(Value::Null),
        Value::Null => Err(eval_error(format!(
            "cannot read property '{}' of null",
            name
        ))),
        other => Err(eval_error(format!(
            "cannot read property '{}' of {}",
            name,
            kind(&other)
        ))),
    }
}

fn index_into(target: Value, index: &Value) -> Result<Value, ExpressionError> {
    match (target, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            let len = items.len();
            match n.as_u64().and_then(|i| usize::try_from(i).ok()) {
                Some(i) if i < len => Ok(items.swap_remove(i)),
                _ => Err(eval_error(format!(
                    "index {} out of range for array of length {}",
                    n, len
                ))),
            }
        }
        (Value::Object(mut map), Value::String(key)) => {
            Ok(map.remove(key).unwrap_or(Value::Null))
        }
        (Value::Null, _) => Err(eval_error("cannot index into null")),
        (target, index) => Err(eval_error(format!(
            "cannot index {} with {}",
            kind(&target),
            kind(index)
        ))),
    }
}

fn add(lhs: &Value, rhs: &Value) -> Value {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                if let Some(sum) = a.checked_add(b) {
                    return Value::from(sum);
                }
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => Number::from_f64(a + b).map(Value::Number).unwrap_or(Value::Null),
                _ => Value::Null,
            }
        }
        _ => Value::String(format!("{}{}", to_text(lhs), to_text(rhs))),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => lhs == rhs,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
