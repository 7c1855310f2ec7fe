//! Loading a set of registries from one configuration document.
//!
//! ```json
//! {
//!   "targets": { "api": { "wp-api": { "wp-api-v2": {} } }, "csv": {} },
//!   "time_zones": { "store_local": 36000 },
//!   "registries": {
//!     "meta": { "handles": { "meta_key": { "path": "key" } } },
//!     "product": { "handles": { "meta": { "sub_data": "meta", "path": "meta_data" } } }
//!   }
//! }
//! ```
//!
//! Registries may embed each other through `sub_data`, in any declaration
//! order, as long as no registry (transitively) embeds itself.

use crate::error::{ConfigError, ConfigResult};
use crate::field::FieldMeta;
use crate::registry::{parse_fields, MetadataRegistry};
use crate::target::TargetTree;
use fieldsync_types::TimeZones;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    #[serde(default)]
    targets: Value,
    #[serde(default)]
    time_zones: TimeZones,
    #[serde(default)]
    registries: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
    #[serde(default)]
    handles: Value,
}

/// All registries of a deployment, sharing one target tree.
#[derive(Debug, Clone)]
pub struct RegistryCatalog {
    targets: Arc<TargetTree>,
    zones: TimeZones,
    registries: HashMap<String, Arc<MetadataRegistry>>,
    names: Vec<String>,
}

impl RegistryCatalog {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        let document: CatalogDocument = serde_json::from_value(value.clone())?;
        let targets = Arc::new(TargetTree::from_value(&document.targets)?);

        let mut raw: HashMap<String, Vec<(String, FieldMeta)>> = HashMap::new();
        let mut names = Vec::with_capacity(document.registries.len());
        for (name, registry) in document.registries {
            let registry: RegistryDocument = serde_json::from_value(registry)?;
            raw.insert(name.clone(), parse_fields(&registry.handles)?);
            names.push(name);
        }

        let mut builder = Builder {
            targets: &targets,
            zones: document.time_zones,
            raw,
            built: HashMap::new(),
            visiting: HashSet::new(),
        };
        for name in &names {
            builder.build(name)?;
        }
        let registries = builder.built;

        info!(
            registries = names.len(),
            targets = targets.len(),
            "registry catalog loaded"
        );
        Ok(Self {
            targets,
            zones: document.time_zones,
            registries,
            names,
        })
    }

    pub fn get(&self, name: &str) -> ConfigResult<Arc<MetadataRegistry>> {
        self.registries
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownRegistry(name.to_string()))
    }

    /// Registry names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn targets(&self) -> &Arc<TargetTree> {
        &self.targets
    }

    pub fn time_zones(&self) -> &TimeZones {
        &self.zones
    }
}

struct Builder<'t> {
    targets: &'t Arc<TargetTree>,
    zones: TimeZones,
    raw: HashMap<String, Vec<(String, FieldMeta)>>,
    built: HashMap<String, Arc<MetadataRegistry>>,
    visiting: HashSet<String>,
}

impl Builder<'_> {
    /// Builds `name` after every registry it embeds (depth first).
    fn build(&mut self, name: &str) -> ConfigResult<Arc<MetadataRegistry>> {
        if let Some(done) = self.built.get(name) {
            return Ok(Arc::clone(done));
        }
        if !self.visiting.insert(name.to_string()) {
            return Err(ConfigError::SubDataCycle(name.to_string()));
        }
        let fields = self
            .raw
            .remove(name)
            .ok_or_else(|| ConfigError::UnknownRegistry(name.to_string()))?;

        let mut subs = HashMap::new();
        for (handle, meta) in &fields {
            let Some(sub) = &meta.sub_data else { continue };
            if !self.raw.contains_key(sub) && !self.built.contains_key(sub) && !self.visiting.contains(sub) {
                return Err(ConfigError::UnknownSubData {
                    handle: handle.clone(),
                    name: sub.clone(),
                });
            }
            let registry = self.build(sub)?;
            subs.insert(sub.clone(), registry);
        }

        let registry = Arc::new(MetadataRegistry::new(
            name,
            Arc::clone(self.targets),
            self.zones,
            fields,
            subs,
        )?);
        self.visiting.remove(name);
        self.built.insert(name.to_string(), Arc::clone(&registry));
        Ok(registry)
    }
}
