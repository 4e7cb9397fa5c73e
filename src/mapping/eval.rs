//! # Template Evaluation
//!
//! Pure recursive evaluation of a parsed [`Template`] against a lookup context.

use super::parser::{Expr, Literal, Node, Template};
use super::MappingError;
use crate::unstructured::shape_name;
use serde_json::Value;
use std::borrow::Cow;

impl Template {
    /// Render the template against `root`
    ///
    /// Every action must resolve to a string, number or boolean.
    pub fn render(&self, root: &Value) -> Result<String, MappingError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(expr) => out.push_str(&render_value(expr, &*evaluate(expr, root)?)?),
            }
        }
        Ok(out)
    }
}

fn render_value(expr: &Expr, value: &Value) -> Result<String, MappingError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(MappingError::Unrenderable {
            expr: expr.to_string(),
            found: shape_name(value),
        }),
    }
}

/// Evaluate an expression to the value it designates
pub fn evaluate<'a>(expr: &Expr, root: &'a Value) -> Result<Cow<'a, Value>, MappingError> {
    match expr {
        Expr::Root => Ok(Cow::Borrowed(root)),
        Expr::Literal(Literal::Str(s)) => Ok(Cow::Owned(Value::String(s.clone()))),
        Expr::Literal(Literal::Int(i)) => Ok(Cow::Owned(Value::from(*i))),
        Expr::Field { target, name } => {
            let base = evaluate(target, root)?;
            step(expr, base, &Value::String(name.clone()))
        }
        Expr::Index { target, keys } => {
            let mut current = evaluate(target, root)?;
            for key in keys {
                let key = evaluate(key, root)?;
                current = step(expr, current, &key)?;
            }
            Ok(current)
        }
    }
}

fn step<'a>(expr: &Expr, base: Cow<'a, Value>, key: &Value) -> Result<Cow<'a, Value>, MappingError> {
    match base {
        Cow::Borrowed(value) => child(expr, value, key).map(Cow::Borrowed),
        Cow::Owned(value) => child(expr, &value, key).map(|v| Cow::Owned(v.clone())),
    }
}

fn child<'v>(expr: &Expr, value: &'v Value, key: &Value) -> Result<&'v Value, MappingError> {
    match (value, key) {
        (Value::Object(map), Value::String(k)) => match map.get(k) {
            Some(Value::Null) | None => Err(MappingError::MissingKey {
                expr: expr.to_string(),
                key: k.clone(),
            }),
            Some(found) => Ok(found),
        },
        (Value::Array(items), Value::Number(n)) => {
            let index = n.as_i64().ok_or_else(|| MappingError::NotIndexable {
                expr: expr.to_string(),
                found: shape_name(value),
                key: n.to_string(),
            })?;
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(|| MappingError::IndexOutOfRange {
                    expr: expr.to_string(),
                    index,
                    len: items.len(),
                })
        }
        _ => Err(MappingError::NotIndexable {
            expr: expr.to_string(),
            found: shape_name(value),
            key: key.to_string(),
        }),
    }
}
