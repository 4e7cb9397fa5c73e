//! # Binding Conditions
//!
//! The three readiness conditions of a bind, and their conversion to status
//! conditions with stable transition times.

use crate::crd::Condition;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Condition reasons
pub mod reasons {
    pub const DATA_COLLECTED: &str = "DataCollected";
    pub const APPLICATION_INJECTED: &str = "ApplicationInjected";
    pub const BINDING_SUCCEEDED: &str = "BindingSucceeded";

    pub const EMPTY_APPLICATION: &str = "EmptyApplication";
    pub const APPLICATION_NOT_FOUND: &str = "ApplicationNotFound";
    pub const SERVICE_NOT_FOUND: &str = "ServiceNotFound";
    pub const UNKNOWN_KIND: &str = "UnknownKind";
    pub const FIELD_TYPE_MISMATCH: &str = "FieldTypeMismatch";
    pub const LOOKUP_PATH_COLLISION: &str = "LookupPathCollision";
    pub const MAPPING_EVALUATION_FAILED: &str = "MappingEvaluationFailed";
    pub const SECRET_WRITE_FAILED: &str = "SecretWriteFailed";
    pub const INJECTION_FAILED: &str = "InjectionFailed";
    pub const CLIENT_ERROR: &str = "ClientError";
    pub const INVALID_OPTIONS: &str = "InvalidOptions";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionType {
    CollectionReady,
    InjectionReady,
    BindingReady,
}

impl ConditionType {
    pub const ALL: [Self; 3] = [Self::CollectionReady, Self::InjectionReady, Self::BindingReady];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CollectionReady => "CollectionReady",
            Self::InjectionReady => "InjectionReady",
            Self::BindingReady => "BindingReady",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionState {
    pub status: bool,
    pub reason: String,
    pub message: String,
}

/// Conditions produced by one bind; setters are last-write-wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingConditions {
    states: BTreeMap<ConditionType, ConditionState>,
}

impl BindingConditions {
    pub fn set(
        &mut self,
        condition_type: ConditionType,
        status: bool,
        reason: &str,
        message: impl Into<String>,
    ) {
        self.states.insert(
            condition_type,
            ConditionState {
                status,
                reason: reason.to_string(),
                message: message.into(),
            },
        );
    }

    pub fn set_true(&mut self, condition_type: ConditionType, reason: &str) {
        self.set(condition_type, true, reason, String::new());
    }

    pub fn set_false(&mut self, condition_type: ConditionType, reason: &str, message: impl Into<String>) {
        self.set(condition_type, false, reason, message);
    }

    pub fn get(&self, condition_type: ConditionType) -> Option<&ConditionState> {
        self.states.get(&condition_type)
    }

    pub fn is_true(&self, condition_type: ConditionType) -> bool {
        self.get(condition_type).is_some_and(|c| c.status)
    }

    /// Status conditions in fixed type order
    ///
    /// `lastTransitionTime` is carried over from `previous` when the status
    /// did not change, otherwise it is set to `now`.
    pub fn to_status_conditions(&self, previous: &[Condition], now: DateTime<Utc>) -> Vec<Condition> {
        let now = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.states
            .iter()
            .map(|(condition_type, state)| {
                let status = if state.status { "True" } else { "False" };
                let last_transition_time = previous
                    .iter()
                    .find(|c| c.r#type == condition_type.as_str() && c.status == status)
                    .and_then(|c| c.last_transition_time.clone())
                    .unwrap_or_else(|| now.clone());
                Condition {
                    r#type: condition_type.as_str().to_string(),
                    status: status.to_string(),
                    last_transition_time: Some(last_transition_time),
                    reason: Some(state.reason.clone()),
                    message: (!state.message.is_empty()).then(|| state.message.clone()),
                }
            })
            .collect()
    }
}
