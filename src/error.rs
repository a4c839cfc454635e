//! Error types for SCIM validation and conformance probing.
//!
//! Three families live here: [`ScimError`] for operational failures that abort
//! an invocation, [`ValidationError`] for schema violations collected by the
//! static validator, and [`ClientError`] for transport-level failures raised by
//! the SCIM HTTP client. [`ProbeErrorKind`] classifies failing probe checks.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Main error type for operational failures.
///
/// These are fatal to a whole invocation: they are raised before any probe
/// phase executes, or when input cannot be read at all.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// The probe was started without acknowledging that it writes to the server
    #[error("Side-effect consent required: {message}")]
    ConsentRequired { message: String },

    /// Invalid or conflicting configuration
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// Failure reading an input document or writing output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The target server could not be reached at all
    #[error("Transport error: {0}")]
    Transport(#[from] ClientError),

    /// Schema not found in the registry
    #[error("Schema not found: {schema_id}")]
    SchemaNotFound { schema_id: String },
}

impl ScimError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a consent error
    pub fn consent_required(message: impl Into<String>) -> Self {
        Self::ConsentRequired {
            message: message.into(),
        }
    }
}

/// Classification of a static validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationErrorKind {
    InvalidJson,
    InvalidSchema,
    MissingRequiredAttribute,
    ImmutableAttributeViolation,
    NullValueViolation,
    StructuralShapeViolation,
    InvalidPatchOperation,
    DuplicatePatchPath,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidJson => "InvalidJson",
            Self::InvalidSchema => "InvalidSchema",
            Self::MissingRequiredAttribute => "MissingRequiredAttribute",
            Self::ImmutableAttributeViolation => "ImmutableAttributeViolation",
            Self::NullValueViolation => "NullValueViolation",
            Self::StructuralShapeViolation => "StructuralShapeViolation",
            Self::InvalidPatchOperation => "InvalidPatchOperation",
            Self::DuplicatePatchPath => "DuplicatePatchPath",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schema violation found by the static validator.
///
/// The path uses dot/bracket notation (`emails[0].value`); attributes of an
/// extension schema are addressed as `<urn>:<attribute>`. Errors are immutable
/// once created and are collected rather than returned early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}{}", location(.path))]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

fn location(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" (at '{}')", path)
    }
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: path.into(),
            schema: None,
        }
    }

    /// Attach the URN of the schema that owns the offending attribute
    pub fn in_schema(mut self, urn: impl Into<String>) -> Self {
        self.schema = Some(urn.into());
        self
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidJson, "", message)
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidSchema, "schemas", message)
    }

    pub fn missing_required(path: impl Into<String>, schema: &str) -> Self {
        let path = path.into();
        let message = format!(
            "Required attribute '{}' is missing or empty; provide a non-empty value",
            path
        );
        Self::new(ValidationErrorKind::MissingRequiredAttribute, path, message).in_schema(schema)
    }

    pub fn immutable(path: impl Into<String>, schema: &str, mutability: &str) -> Self {
        let path = path.into();
        let message = format!(
            "Attribute '{}' is {} and is assigned by the server; remove it from the request",
            path, mutability
        );
        Self::new(ValidationErrorKind::ImmutableAttributeViolation, path, message)
            .in_schema(schema)
    }

    pub fn null_value(path: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!(
            "Attribute '{}' is null; omit it, or use a PATCH 'remove' operation to clear it",
            path
        );
        Self::new(ValidationErrorKind::NullValueViolation, path, message)
    }

    pub fn shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::StructuralShapeViolation, path, message)
    }

    pub fn invalid_patch(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidPatchOperation, path, message)
    }

    pub fn duplicate_path(at: impl Into<String>, value: &str, occurrences: usize) -> Self {
        let message = format!(
            "PATCH path '{}' appears in {} operations; combine them into a single operation",
            value, occurrences
        );
        Self::new(ValidationErrorKind::DuplicatePatchPath, at, message)
    }
}

/// Transport-level failures raised by the SCIM HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request did not complete within the per-request timeout
    #[error("{method} {url} timed out after {timeout:?}")]
    Timeout {
        method: String,
        url: String,
        timeout: Duration,
    },

    /// The server kept answering 429 after every retry
    #[error("{method} {url} still rate limited (429) after {attempts} attempts")]
    RateLimitExhausted {
        method: String,
        url: String,
        attempts: u32,
    },

    /// Connection, TLS or protocol failure
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },
}

/// Classification of a failing or warning probe check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProbeErrorKind {
    UnexpectedStatus,
    RateLimitExhausted,
    TransientInstability,
    ContentTypeRejection,
    DeviationWarning,
    DeviationFailure,
    Timeout,
    Transport,
}

impl From<&ClientError> for ProbeErrorKind {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::Timeout { .. } => Self::Timeout,
            ClientError::RateLimitExhausted { .. } => Self::RateLimitExhausted,
            ClientError::Transport { .. } => Self::Transport,
        }
    }
}

/// Result type for operational failures
pub type ScimResult<T> = Result<T, ScimError>;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
