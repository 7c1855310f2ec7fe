//! Schema-driven translation between canonical records and target shapes.
//!
//! Layers, leaves first:
//! - [`path`] — dotted/bracketed locators, copy-on-write `set`
//! - [`types`] — one named normalize/denormalize pair per type tag
//! - [`structure`] — nested sub-entity collections (singular, listed, mapped)
//! - [`RecordTranslator`] — whole-record translation for a target
//!
//! ```
//! use fieldsync_schema::{MetadataRegistry, TargetTree};
//! use fieldsync_translate::RecordTranslator;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let targets = Arc::new(TargetTree::from_value(&json!({ "api": null })).unwrap());
//! let registry = MetadataRegistry::from_value("product", targets, &json!({
//!     "price": { "path": "regular_price", "type": "currency" },
//! })).unwrap();
//!
//! let translator = RecordTranslator::new(&registry);
//! let record = translator.to_canonical(&json!({ "regular_price": "12.50" }), "api").unwrap();
//! assert_eq!(record.value["price"], json!(1250));
//! ```

mod error;
pub mod path;
pub mod php;
mod record;
pub mod structure;
pub mod types;

pub use error::{TranslationError, TranslationResult};
pub use path::{ContainerHint, Segment};
pub use record::{Diagnostic, RecordTranslator, Translated};
pub use types::TypeContext;
