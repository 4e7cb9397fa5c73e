//! # ServiceBinding Status
//!
//! Status types for tracking binding readiness.

use serde::{Deserialize, Serialize};

/// Status of the ServiceBinding resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, schemars::JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingStatus {
    /// Conditions represent the latest available observations
    /// Types: CollectionReady, InjectionReady, BindingReady
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Name of the Secret holding the binding data
    #[serde(default)]
    pub secret: Option<String>,
    /// Observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl ServiceBindingStatus {
    /// Look up a condition by type
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }
}
