//! The metadata registry.
//!
//! Resolving a property of handle `h` for target `T`:
//! 1. `h`'s override for `T`, if it declares the property;
//! 2. otherwise the override of the closest ancestor of `T` that declares it;
//! 3. otherwise `h`'s global declaration;
//! 4. otherwise the property's fixed fallback ([`Property::fallback`]).
//!
//! Target names are validated once when a [`Scope`] is created; resolution
//! through a scope is total.

use crate::error::{ConfigError, ConfigResult};
use crate::field::FieldMeta;
use crate::graph::dependency_order;
use crate::property::{
    ComparisonKind, FieldProperties, ForcedMapping, Property, Structure, SyncMode, TypeTag,
};
use crate::target::TargetTree;
use fieldsync_types::TimeZones;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Handle → path pairs, in declaration order.
pub type PathTable = Vec<(String, String)>;

/// Immutable per-field metadata for one entity type.
///
/// Safe to share between threads once built.
#[derive(Debug)]
pub struct MetadataRegistry {
    name: String,
    targets: Arc<TargetTree>,
    zones: TimeZones,
    fields: Vec<(String, FieldMeta)>,
    index: HashMap<String, usize>,
    subs: HashMap<String, Arc<MetadataRegistry>>,
    order: Vec<usize>,
}

impl MetadataRegistry {
    /// Builds and validates a registry.
    ///
    /// `subs` must contain every registry named by a field's `sub_data`.
    pub fn new(
        name: impl Into<String>,
        targets: Arc<TargetTree>,
        zones: TimeZones,
        fields: Vec<(String, FieldMeta)>,
        subs: HashMap<String, Arc<MetadataRegistry>>,
    ) -> ConfigResult<Self> {
        let name = name.into();
        let mut index = HashMap::with_capacity(fields.len());
        for (i, (handle, _)) in fields.iter().enumerate() {
            if index.insert(handle.clone(), i).is_some() {
                return Err(ConfigError::InvalidProperty {
                    handle: handle.clone(),
                    property: "*".into(),
                    reason: format!("declared twice in registry {name}"),
                });
            }
        }

        for (handle, meta) in &fields {
            for target in meta.targets.keys() {
                targets.validate(target)?;
            }
            if let Some(sub) = &meta.sub_data {
                let registry = subs.get(sub).ok_or_else(|| ConfigError::UnknownSubData {
                    handle: handle.clone(),
                    name: sub.clone(),
                })?;
                validate_structures(handle, meta, Some(registry))?;
            } else {
                validate_structures(handle, meta, None)?;
            }
        }

        let order = dependency_order(&name, &fields, &index)?;
        debug!(registry = %name, handles = fields.len(), "registry validated");

        Ok(Self {
            name,
            targets,
            zones,
            fields,
            index,
            subs,
            order,
        })
    }

    /// Builds a registry without sub-entities from a `{handle: {...}}` object.
    pub fn from_value(
        name: impl Into<String>,
        targets: Arc<TargetTree>,
        handles: &Value,
    ) -> ConfigResult<Self> {
        Self::new(
            name,
            targets,
            TimeZones::default(),
            parse_fields(handles)?,
            HashMap::new(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn targets(&self) -> &TargetTree {
        &self.targets
    }

    pub fn shared_targets(&self) -> Arc<TargetTree> {
        Arc::clone(&self.targets)
    }

    pub fn time_zones(&self) -> &TimeZones {
        &self.zones
    }

    /// Handles in declaration order.
    pub fn handles(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(h, _)| h.as_str())
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.index.contains_key(handle)
    }

    pub fn field(&self, handle: &str) -> Option<&FieldMeta> {
        self.index.get(handle).map(|i| &self.fields[*i].1)
    }

    fn require(&self, handle: &str) -> ConfigResult<&FieldMeta> {
        self.field(handle).ok_or_else(|| ConfigError::UnknownHandle {
            registry: self.name.clone(),
            handle: handle.to_string(),
        })
    }

    /// The registry describing a handle's sub-entities.
    pub fn sub_registry(&self, handle: &str) -> Option<&Arc<MetadataRegistry>> {
        self.field(handle)
            .and_then(|meta| meta.sub_data.as_ref())
            .and_then(|name| self.subs.get(name))
    }

    pub fn aliases(&self, handle: &str) -> &[String] {
        self.field(handle).map_or(&[], |meta| meta.aliases.as_slice())
    }

    /// Handles ordered so that every handle precedes its aliases.
    pub fn dependency_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|i| self.fields[*i].0.as_str())
    }

    /// A validated view of the registry for one target (`None` = global only).
    pub fn scope(&self, target: Option<&str>) -> ConfigResult<Scope<'_>> {
        match target {
            Some(t) => Ok(Scope {
                registry: self,
                chain: self.targets.chain(t)?,
            }),
            None => Ok(self.global_scope()),
        }
    }

    /// The target-independent view: global declarations only.
    pub fn global_scope(&self) -> Scope<'_> {
        Scope {
            registry: self,
            chain: &[],
        }
    }

    /// Resolves one property of one handle for a target.
    pub fn resolve_property(
        &self,
        handle: &str,
        property: Property,
        target: Option<&str>,
    ) -> ConfigResult<Value> {
        self.require(handle)?;
        Ok(self.scope(target)?.property(handle, property))
    }

    /// Resolves one property for every handle, in declaration order.
    pub fn resolve_all(
        &self,
        property: Property,
        target: Option<&str>,
    ) -> ConfigResult<Map<String, Value>> {
        let scope = self.scope(target)?;
        Ok(self
            .handles()
            .map(|h| (h.to_string(), scope.property(h, property)))
            .collect())
    }

    /// Handles that exist in a target (non-null path), minus `excluding`.
    pub fn target_path_translation(
        &self,
        target: &str,
        excluding: &[&str],
    ) -> ConfigResult<PathTable> {
        let scope = self.scope(Some(target))?;
        Ok(self
            .handles()
            .filter(|h| !excluding.contains(h))
            .filter_map(|h| scope.path(h).map(|p| (h.to_string(), p.to_string())))
            .collect())
    }

    /// Handles taking part in resolution, parents ahead of aliases.
    ///
    /// A handle takes part if its sync mode is active or it is reflective.
    pub fn sync_handles(&self, target: Option<&str>) -> ConfigResult<Vec<&str>> {
        let scope = self.scope(target)?;
        Ok(self
            .dependency_order()
            .filter(|h| scope.sync_mode(h).is_some_and(SyncMode::is_active) || scope.is_reflective(h))
            .collect())
    }
}

pub(crate) fn parse_fields(handles: &Value) -> ConfigResult<Vec<(String, FieldMeta)>> {
    match handles {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => map
            .iter()
            .map(|(handle, decl)| Ok((handle.clone(), FieldMeta::from_value(handle, decl)?)))
            .collect(),
        other => Err(ConfigError::InvalidProperty {
            handle: "*".into(),
            property: "handles".into(),
            reason: format!("expected an object, found {other}"),
        }),
    }
}

fn validate_structures(
    handle: &str,
    meta: &FieldMeta,
    sub: Option<&Arc<MetadataRegistry>>,
) -> ConfigResult<()> {
    let layers = std::iter::once(&meta.global).chain(meta.targets.values());
    for structure in layers.filter_map(|p: &FieldProperties| p.structure.as_ref()) {
        let invalid = |reason: String| ConfigError::InvalidProperty {
            handle: handle.to_string(),
            property: "structure".into(),
            reason,
        };
        let sub = sub.ok_or_else(|| invalid(format!("{structure} declared without sub_data")))?;
        for referenced in structure.key_handle().into_iter().chain(structure.value_handle()) {
            if !sub.contains(referenced) {
                return Err(invalid(format!(
                    "{structure} references {referenced}, unknown in {}",
                    sub.name()
                )));
            }
        }
    }
    Ok(())
}

/// A registry viewed through one target's resolution chain.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    registry: &'a MetadataRegistry,
    chain: &'a [String],
}

impl<'a> Scope<'a> {
    pub fn registry(&self) -> &'a MetadataRegistry {
        self.registry
    }

    /// The same registry with no target: global declarations only.
    pub fn global(&self) -> Scope<'a> {
        Scope {
            registry: self.registry,
            chain: &[],
        }
    }

    /// The target this scope resolves for, if any.
    pub fn target(&self) -> Option<&'a str> {
        self.chain.first().map(String::as_str)
    }

    fn lookup<T>(&self, handle: &str, pick: impl Fn(&'a FieldProperties) -> Option<T>) -> Option<T> {
        let meta = self.registry.field(handle)?;
        meta.layers(self.chain).find_map(pick)
    }

    /// Resolves a property as JSON, falling back to its fixed default.
    pub fn property(&self, handle: &str, property: Property) -> Value {
        self.lookup(handle, |p| p.get(property))
            .unwrap_or_else(|| property.fallback())
    }

    /// The handle's locator in this target; `None` if it does not exist here.
    pub fn path(&self, handle: &str) -> Option<&'a str> {
        self.lookup(handle, |p| p.path.as_ref().map(|o| o.as_deref()))
            .flatten()
    }

    pub fn type_tag(&self, handle: &str) -> Option<TypeTag> {
        self.lookup(handle, |p| p.type_tag)
    }

    pub fn structure(&self, handle: &str) -> Option<&'a Structure> {
        self.lookup(handle, |p| p.structure.as_ref())
    }

    pub fn is_readable(&self, handle: &str) -> bool {
        self.lookup(handle, |p| p.read).unwrap_or(true)
    }

    pub fn is_writable(&self, handle: &str) -> bool {
        self.lookup(handle, |p| p.write).unwrap_or(true)
    }

    pub fn sync_mode(&self, handle: &str) -> Option<SyncMode> {
        self.lookup(handle, |p| p.sync)
    }

    pub fn is_reflective(&self, handle: &str) -> bool {
        self.lookup(handle, |p| p.reflective).unwrap_or(false)
    }

    pub fn is_delta(&self, handle: &str) -> bool {
        self.lookup(handle, |p| p.delta).unwrap_or(false)
    }

    pub fn is_static(&self, handle: &str) -> bool {
        self.lookup(handle, |p| p.static_).unwrap_or(false)
    }

    pub fn is_important(&self, handle: &str) -> bool {
        self.lookup(handle, |p| p.important).unwrap_or(false)
    }

    pub fn is_textual(&self, handle: &str) -> bool {
        self.lookup(handle, |p| p.textual).unwrap_or(false)
    }

    pub fn default_value(&self, handle: &str) -> Value {
        self.lookup(handle, |p| p.default.clone())
            .unwrap_or(Value::Null)
    }

    pub fn comparison_kind(&self, handle: &str) -> ComparisonKind {
        self.lookup(handle, |p| p.comparison).unwrap_or_default()
    }

    pub fn forced_mapping(&self, handle: &str) -> Option<&'a ForcedMapping> {
        self.lookup(handle, |p| p.force_mapping.as_ref())
    }

    pub fn enum_options(&self, handle: &str) -> Option<&'a [String]> {
        self.lookup(handle, |p| p.options.as_deref())
    }

    /// The handle holding this field's column-level modification time.
    pub fn modtime_handle(&self, handle: &str) -> Option<&'a str> {
        self.lookup(handle, |p| p.modtime.as_deref())
    }

    /// The same target chain applied to a handle's sub-entity registry.
    pub fn sub_scope(&self, handle: &str) -> Option<Scope<'a>> {
        self.registry.sub_registry(handle).map(|sub| Scope {
            registry: sub.as_ref(),
            chain: self.chain,
        })
    }
}
