//! Error types for registry loading and validation.

use thiserror::Error;

/// Result type for registry operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fatal configuration errors.
///
/// These are raised while a catalog is loaded and validated. A registry that
/// loaded successfully never produces them for declared targets and handles.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A target name that is not declared in the target tree.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// A target name declared more than once in the tree.
    #[error("target declared more than once: {0}")]
    DuplicateTarget(String),

    /// The target tree is not a nested mapping of names.
    #[error("malformed target tree: {0}")]
    MalformedTree(String),

    /// A registry name that is not declared in the catalog.
    #[error("unknown registry: {0}")]
    UnknownRegistry(String),

    /// A handle that is not declared in the registry.
    #[error("unknown handle {handle} in registry {registry}")]
    UnknownHandle { registry: String, handle: String },

    /// A `sub_data` reference to a registry that does not exist.
    #[error("handle {handle} references unknown sub registry {name}")]
    UnknownSubData { handle: String, name: String },

    /// Registries that (transitively) embed themselves.
    #[error("sub_data cycle through registry {0}")]
    SubDataCycle(String),

    /// Aliases that (transitively) alias themselves.
    #[error("alias cycle in registry {registry} involving {handles:?}")]
    AliasCycle {
        registry: String,
        handles: Vec<String>,
    },

    /// A property that is unknown or has an invalid value.
    #[error("invalid property {property} on handle {handle}: {reason}")]
    InvalidProperty {
        handle: String,
        property: String,
        reason: String,
    },

    /// The catalog document could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
