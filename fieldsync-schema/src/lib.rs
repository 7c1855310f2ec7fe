//! Declarative field metadata for fieldsync.
//!
//! Defines the schema every translation and resolution step is driven by:
//! - [`TargetTree`] — the forest of external shapes and their inheritance
//! - [`FieldMeta`] / [`FieldProperties`] — per-handle properties with
//!   per-target overrides
//! - [`MetadataRegistry`] / [`Scope`] — ancestor-walk property resolution
//! - [`RegistryCatalog`] — loads a validated set of registries from JSON
//!
//! Registries are immutable once built and can be shared freely across
//! threads behind an `Arc`.

mod catalog;
mod error;
mod field;
mod graph;
mod property;
mod registry;
mod target;

pub use catalog::RegistryCatalog;
pub use error::{ConfigError, ConfigResult};
pub use field::FieldMeta;
pub use property::{
    ComparisonKind, FieldProperties, ForcedMapping, Property, Structure, SyncMode, TypeTag,
};
pub use registry::{MetadataRegistry, PathTable, Scope};
pub use target::TargetTree;
