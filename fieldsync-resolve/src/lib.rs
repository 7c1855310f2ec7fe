//! Field-level conflict resolution between two canonical records.
//!
//! A [`Resolver`] is built once per run from a registry and a
//! [`SyncContext`]. Each matched pair then goes through one
//! [`ConflictUpdate`]:
//!
//! ```
//! use fieldsync_resolve::{Resolver, SyncContext};
//! use fieldsync_schema::{MetadataRegistry, TargetTree};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let targets = Arc::new(TargetTree::from_value(&json!({ "api": null })).unwrap());
//! let registry = MetadataRegistry::from_value("customer", targets, &json!({
//!     "email": { "path": "email", "sync": "normal" },
//! })).unwrap();
//! let ctx = SyncContext {
//!     master_target: Some("api".into()),
//!     slave_target: Some("api".into()),
//!     ..SyncContext::default()
//! };
//!
//! let resolver = Resolver::new(Arc::new(registry), ctx).unwrap();
//! let master = json!({ "email": "a@example.com", "modtime": "2024-03-02T00:00:00Z" });
//! let slave = json!({ "email": "b@example.com", "modtime": "2024-03-01T00:00:00Z" });
//! let update = resolver
//!     .resolve(
//!         master.as_object().unwrap().clone(),
//!         slave.as_object().unwrap().clone(),
//!         None,
//!     )
//!     .unwrap();
//!
//! let patch = update.get_slave_patch().unwrap().unwrap();
//! assert_eq!(patch.payload, json!({ "email": "a@example.com" }));
//! assert!(update.get_master_patch().unwrap().is_none());
//! ```
//!
//! Fuzzy equivalence and reflection are table driven by the registry's
//! `comparison` category; see [`Comparators`] and [`Reflectors`].

mod arena;
mod batch;
mod context;
mod decision;
mod engine;
mod error;
mod patch;
pub mod reflect;
pub mod similarity;

pub use arena::SnapshotArena;
pub use batch::{resolve_batch, PairInput};
pub use context::{MergeMode, SyncContext};
pub use decision::{Decision, DecisionBuilder, DecisionLog, Reason, ReportRow};
pub use engine::{ConflictUpdate, EditHeuristic, NeverSlaveEdited, ResolutionOutcome, Resolver};
pub use error::{ResolutionError, ResolutionResult};
pub use patch::Patch;
pub use reflect::Reflectors;
pub use similarity::{Comparators, Similarity};
