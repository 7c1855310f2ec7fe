//! Core type definitions for fieldsync.
//!
//! This crate defines the target-agnostic types shared by the translation and
//! resolution engines:
//! - [`Record`] — the canonical, ordered handle → value mapping
//! - [`Side`] — which of the two reconciled systems a value belongs to
//! - [`TimeUtil`] / [`TimeZones`] — named zone conversions for the datetime
//!   formats used by the external systems
//!
//! Nothing in here knows about a particular external API's field names.

mod record;
mod side;
pub mod time;

pub use record::{is_blank, value_to_text, Record};
pub use side::Side;
pub use time::{TimeUtil, TimeZones, Zone};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
