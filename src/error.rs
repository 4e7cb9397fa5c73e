//! # Bind Errors
//!
//! The error that ends a bind operation, and the condition reason it maps to.

use crate::binder::conditions::reasons;
use crate::binder::injection::InjectionError;
use crate::mapping::MappingError;
use crate::resolver::{ClientError, LocateError};
use crate::unstructured::FieldError;
use thiserror::Error;

/// Error ending a bind operation
///
/// `reason()` is the condition reason surfaced on the binding, `is_retryable()`
/// tells the controller whether requeueing with backoff can help.
#[derive(Debug, Error)]
pub enum BindError {
    /// The binder was configured incorrectly; no conditions are produced
    #[error("invalid binder options: {0}")]
    InvalidOptions(String),
    #[error("unknown kind {0}")]
    UnknownKind(String),
    #[error("service {0} not found")]
    ServiceNotFound(String),
    #[error("bindable field of {service}: {source}")]
    FieldTypeMismatch {
        service: String,
        #[source]
        source: FieldError,
    },
    #[error("lookup path '{path}' collides with an existing entry")]
    LookupPathCollision { path: String },
    #[error("mapping '{name}': {source}")]
    Mapping {
        name: String,
        #[source]
        source: MappingError,
    },
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("writing secret '{secret}': {source}")]
    SecretWrite {
        secret: String,
        #[source]
        source: ClientError,
    },
    #[error("marking service {service}: {source}")]
    ServiceMark {
        service: String,
        #[source]
        source: ClientError,
    },
    #[error("injecting into {application}: {source}")]
    Injection {
        application: String,
        #[source]
        source: InjectionError,
    },
}

impl BindError {
    /// Condition reason for this error
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidOptions(_) => reasons::INVALID_OPTIONS,
            Self::UnknownKind(_) => reasons::UNKNOWN_KIND,
            Self::ServiceNotFound(_) => reasons::SERVICE_NOT_FOUND,
            Self::FieldTypeMismatch { .. } => reasons::FIELD_TYPE_MISMATCH,
            Self::LookupPathCollision { .. } => reasons::LOOKUP_PATH_COLLISION,
            Self::Mapping { .. } => reasons::MAPPING_EVALUATION_FAILED,
            Self::Client(_) | Self::ServiceMark { .. } => reasons::CLIENT_ERROR,
            Self::SecretWrite { .. } => reasons::SECRET_WRITE_FAILED,
            Self::Injection { .. } => reasons::INJECTION_FAILED,
        }
    }

    /// Whether retrying the same binding may succeed without user action
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ServiceNotFound(_)
            | Self::Client(_)
            | Self::SecretWrite { .. }
            | Self::ServiceMark { .. } => true,
            Self::Injection { source, .. } => source.is_retryable(),
            Self::InvalidOptions(_)
            | Self::UnknownKind(_)
            | Self::FieldTypeMismatch { .. }
            | Self::LookupPathCollision { .. }
            | Self::Mapping { .. } => false,
        }
    }
}

impl From<LocateError> for BindError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::UnknownKind(kind) => Self::UnknownKind(kind),
            LocateError::Client(e) => Self::Client(e),
        }
    }
}

impl From<serde_json::Error> for BindError {
    fn from(err: serde_json::Error) -> Self {
        Self::Client(ClientError::Serialization(err))
    }
}
