//! # Lookup Context
//!
//! The nested mapping mapping templates are evaluated against. Every service
//! is reachable three ways:
//!
//! - `[version][group][kind][name]` exactly as served
//! - the same path with `.` in the group and `-` in the name replaced by `_`
//! - `[id]` when the service declares one

use super::context::ServiceContext;
use crate::error::BindError;
use crate::unstructured::{format_path, set_nested_field, FieldError};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    root: Map<String, Value>,
    /// Top-level keys written by resource paths (versions)
    path_keys: HashSet<String>,
    /// Top-level keys written by ids
    id_keys: HashSet<String>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one service under all of its paths; writes are additive
    pub fn add_service(&mut self, context: &ServiceContext) -> Result<(), BindError> {
        for path in [context.identity.raw_path(), context.identity.sanitized_path()] {
            if self.id_keys.contains(&path[0]) {
                return Err(BindError::LookupPathCollision {
                    path: format_path(&path),
                });
            }
            set_nested_field(&mut self.root, context.service.clone(), &path).map_err(|e| {
                let path = match e {
                    FieldError::WrongShape { path, .. } | FieldError::NotFound { path } => path,
                };
                BindError::LookupPathCollision { path }
            })?;
            self.path_keys.insert(path[0].clone());
        }

        if let Some(id) = context.id.as_deref().filter(|id| !id.is_empty()) {
            if self.path_keys.contains(id) {
                return Err(BindError::LookupPathCollision {
                    path: id.to_string(),
                });
            }
            if !self.id_keys.insert(id.to_string()) {
                warn!(id = %id, service = %context.identity, "service id reused, later service wins");
            }
            self.root.insert(id.to_string(), context.service.clone());
        }
        Ok(())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}
