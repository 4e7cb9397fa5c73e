//! # Mapping Expressions
//!
//! Custom binding variables rendered from Go-template style expressions.
//!
//! ## Supported syntax
//!
//! - `{{ .v1alpha1.postgresql_example_org.Database.db1.status.dbName }}`
//! - `{{ index . "v1alpha1" "postgresql.example.org" "Database" "db1" "status" "dbName" }}`
//!   (the leading `.` may be omitted)
//! - integer keys index sequences, parentheses group sub-expressions
//! - `{{-` / `-}}` trim surrounding whitespace, `{{/* ... */}}` is a comment
//!
//! ## Module Structure
//!
//! - `parser.rs` - lexer and parser producing a `Template`
//! - `eval.rs` - evaluation against the lookup context

mod eval;
mod parser;

pub use eval::evaluate;
pub use parser::{Expr, Literal, Node, Template};

use crate::crd::Mapping;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static ENV_VAR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Failed to compile env var name regex")
});

/// Failure to parse or evaluate a mapping
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("'{0}' is not a valid environment variable name")]
    InvalidName(String),
    #[error("template parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("{expr}: map has no entry for key \"{key}\"")]
    MissingKey { expr: String, key: String },
    #[error("{expr}: index {index} out of range for sequence of length {len}")]
    IndexOutOfRange {
        expr: String,
        index: i64,
        len: usize,
    },
    #[error("{expr}: cannot index {found} with {key}")]
    NotIndexable {
        expr: String,
        found: &'static str,
        key: String,
    },
    #[error("{expr}: evaluates to {found}, which cannot be rendered")]
    Unrenderable { expr: String, found: &'static str },
}

/// Whether `name` can be used as an environment variable name
pub fn is_valid_name(name: &str) -> bool {
    ENV_VAR_NAME.is_match(name)
}

/// Validate, parse and render one mapping against the lookup context
pub fn evaluate_mapping(mapping: &Mapping, context: &Value) -> Result<String, MappingError> {
    if !is_valid_name(&mapping.name) {
        return Err(MappingError::InvalidName(mapping.name.clone()));
    }
    Template::parse(&mapping.value)?.render(context)
}
