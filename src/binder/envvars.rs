//! # Environment Variable Derivation
//!
//! Key composition and derivation of variables from bindable fields.

use super::bindable::{BindableField, BindableKind};
use crate::unstructured::{format_path, nested_field, shape_name, FieldError};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Upper-case `raw`, replacing every non-ASCII-alphanumeric character with `_`
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Join non-empty segments with `_` and sanitize the result
pub fn build_key<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    sanitize(&joined)
}

/// Prefix segments for one service
///
/// The global prefix comes first when non-empty. The service prefix follows
/// when non-empty; an absent service prefix falls back to the kind, while an
/// explicitly empty one disables the per-service prefix altogether.
pub fn prefixes(global: Option<&str>, service: Option<&str>, kind: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(global) = global.filter(|p| !p.is_empty()) {
        out.push(global.to_string());
    }
    match service {
        Some(prefix) if !prefix.is_empty() => out.push(prefix.to_string()),
        Some(_) => {}
        None => out.push(kind.to_string()),
    }
    out
}

/// Derive unprefixed variables (`name -> value`) from the bindable fields of a service
///
/// Fields that are absent are skipped. Fields of the wrong shape fail.
pub fn derive_env_vars(
    service: &Value,
    fields: &[BindableField],
) -> Result<BTreeMap<String, String>, FieldError> {
    let mut vars = BTreeMap::new();
    for field in fields {
        let value = match nested_field(service, &field.path) {
            Ok(value) => value,
            Err(FieldError::NotFound { path }) => {
                debug!(field = %path, "bindable field absent");
                continue;
            }
            Err(e) => return Err(e),
        };

        match field.kind {
            BindableKind::Attribute => {
                let s = value.as_str().ok_or_else(|| FieldError::WrongShape {
                    path: format_path(&field.path),
                    expected: "a string",
                    found: shape_name(value),
                })?;
                vars.insert(field.name.clone(), s.to_string());
            }
            BindableKind::Object => {
                let map = value.as_object().ok_or_else(|| FieldError::WrongShape {
                    path: format_path(&field.path),
                    expected: "a mapping",
                    found: shape_name(value),
                })?;
                for (key, child) in map {
                    let s = child.as_str().ok_or_else(|| FieldError::WrongShape {
                        path: format!("{}.{key}", format_path(&field.path)),
                        expected: "a string",
                        found: shape_name(child),
                    })?;
                    vars.insert(format!("{}_{key}", field.name), s.to_string());
                }
            }
        }
    }
    Ok(vars)
}
