//! Error types for conflict resolution.

use fieldsync_schema::ConfigError;
use fieldsync_translate::TranslationError;
use fieldsync_types::Side;
use thiserror::Error;

/// Result type for resolution operations.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Errors raised while resolving a pair.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// An internal contract was broken, e.g. a decision without a reason.
    /// Never expected with a valid registry.
    #[error("resolution assertion failed: {0}")]
    Assertion(String),

    /// A side has no identifier to address its patch to.
    #[error("{side} patch has no primary key")]
    PrimaryKeyMissing { side: Side },

    /// A patch could not be expressed in its target shape.
    #[error("translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Unknown target or handle, or a missing sync setting.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ConfigError> for ResolutionError {
    fn from(err: ConfigError) -> Self {
        ResolutionError::Config(err.to_string())
    }
}
