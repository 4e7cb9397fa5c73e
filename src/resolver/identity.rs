//! # Resource Identity
//!
//! The immutable identity of a resolved resource and the lookup paths derived from it.

use std::fmt;

/// Identity of a resolved resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceIdentity {
    /// `[version][group][kind][name]`, exactly as served
    pub fn raw_path(&self) -> [String; 4] {
        [
            self.version.clone(),
            self.group.clone(),
            self.kind.clone(),
            self.name.clone(),
        ]
    }

    /// `[version][group][kind][name]` with `.` in the group and `-` in the
    /// name replaced by `_`, so every segment can be reached with dotted access
    pub fn sanitized_path(&self) -> [String; 4] {
        [
            self.version.clone(),
            self.group.replace('.', "_"),
            self.kind.clone(),
            self.name.replace('-', "_"),
        ]
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_version = if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        };
        match &self.namespace {
            Some(ns) => write!(f, "{api_version} {} {ns}/{}", self.kind, self.name),
            None => write!(f, "{api_version} {} {}", self.kind, self.name),
        }
    }
}
