//! Error types for translation.

use fieldsync_schema::ConfigError;
use thiserror::Error;

/// Result type for translation operations.
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Errors raised while translating a field.
///
/// All variants except [`TranslationError::Config`] are recoverable per field:
/// the record translator skips the offending handle and reports it as a
/// [`Diagnostic`](crate::Diagnostic).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslationError {
    /// A path segment is absent from the payload.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// A path locator could not be parsed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A singular structure met a listed or mapped one (or vice versa).
    #[error("structure mismatch: cannot translate {from} as {to}")]
    StructureMismatch { from: String, to: String },

    /// The payload does not have the container shape a structure expects.
    #[error("unexpected shape: expected {expected}, found {found}")]
    UnexpectedShape { expected: String, found: String },

    /// A value could not be coerced to or from its type tag.
    #[error("cannot coerce {value} as {tag}: {reason}")]
    Coercion {
        tag: String,
        value: String,
        reason: String,
    },

    /// Unknown target or handle; fatal.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ConfigError> for TranslationError {
    fn from(err: ConfigError) -> Self {
        TranslationError::Config(err.to_string())
    }
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "mapping",
    }
}
