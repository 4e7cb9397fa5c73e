//! # Unstructured Field Access
//!
//! Accessors over schema-less resource field trees (`serde_json::Value`).
//!
//! Every accessor reports a typed [`FieldError`] instead of panicking, so
//! callers can decide whether a missing or mis-shaped field is fatal.

use serde_json::{Map, Value};
use thiserror::Error;

/// Failure to read or write a nested field
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("field '{path}' not found")]
    NotFound { path: String },
    #[error("field '{path}' is {found}, expected {expected}")]
    WrongShape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Human-readable name of a value's shape
pub fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Render a path as `a.b.c`
pub fn format_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a dotted path (`spec.template.spec`) into segments
///
/// Empty input yields no segments.
pub fn split_path(dotted: &str) -> Vec<String> {
    dotted
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the value at `path`
pub fn nested_field<'a, S: AsRef<str>>(obj: &'a Value, path: &[S]) -> Result<&'a Value, FieldError> {
    let mut current = obj;
    for (i, segment) in path.iter().enumerate() {
        let map = current.as_object().ok_or_else(|| FieldError::WrongShape {
            path: format_path(&path[..i]),
            expected: "a mapping",
            found: shape_name(current),
        })?;
        current = map.get(segment.as_ref()).ok_or_else(|| FieldError::NotFound {
            path: format_path(&path[..=i]),
        })?;
    }
    Ok(current)
}

/// Mutable access to the value at `path`
pub fn nested_field_mut<'a, S: AsRef<str>>(
    obj: &'a mut Value,
    path: &[S],
) -> Result<&'a mut Value, FieldError> {
    let mut current = obj;
    for (i, segment) in path.iter().enumerate() {
        let found = shape_name(current);
        let map = current.as_object_mut().ok_or_else(|| FieldError::WrongShape {
            path: format_path(&path[..i]),
            expected: "a mapping",
            found,
        })?;
        current = map.get_mut(segment.as_ref()).ok_or_else(|| FieldError::NotFound {
            path: format_path(&path[..=i]),
        })?;
    }
    Ok(current)
}

/// Write `value` at `path`, creating intermediate mappings
///
/// Fails when an intermediate segment already holds a non-mapping value.
/// The final segment is overwritten unconditionally.
pub fn set_nested_field<S: AsRef<str>>(
    obj: &mut Map<String, Value>,
    value: Value,
    path: &[S],
) -> Result<(), FieldError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(FieldError::NotFound {
            path: String::new(),
        });
    };

    let mut current = obj;
    for (i, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.as_ref().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let found = shape_name(entry);
        current = entry.as_object_mut().ok_or_else(|| FieldError::WrongShape {
            path: format_path(&path[..=i]),
            expected: "a mapping",
            found,
        })?;
    }
    current.insert(last.as_ref().to_string(), value);
    Ok(())
}

/// Mutable access to the sequence at `path`, creating it (and its parents) when missing
pub fn sequence_mut<'a, S: AsRef<str>>(
    obj: &'a mut Value,
    path: &[S],
) -> Result<&'a mut Vec<Value>, FieldError> {
    let mut current = obj;
    for (i, segment) in path.iter().enumerate() {
        let found = shape_name(current);
        let map = current.as_object_mut().ok_or_else(|| FieldError::WrongShape {
            path: format_path(&path[..i]),
            expected: "a mapping",
            found,
        })?;
        let default = if i + 1 == path.len() {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
        current = map.entry(segment.as_ref().to_string()).or_insert(default);
    }
    let found = shape_name(current);
    current.as_array_mut().ok_or_else(|| FieldError::WrongShape {
        path: format_path(path),
        expected: "a sequence",
        found,
    })
}
