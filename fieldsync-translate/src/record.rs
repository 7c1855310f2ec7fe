//! Whole-record translation between a target's raw payload and a canonical
//! record.
//!
//! Both directions are pure functions of (input, target, registry). A handle
//! that fails to translate is left out of the output and reported as a
//! [`Diagnostic`]; the rest of the record still translates.

use crate::error::{TranslationError, TranslationResult};
use crate::path::{self, ContainerHint};
use crate::structure::{self, DEFAULT_STRUCTURE};
use crate::types::{self, TypeContext};
use fieldsync_schema::{MetadataRegistry, Scope, Structure};
use fieldsync_types::Record;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A handle left out of a translation, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Dotted handle, prefixed by the enclosing nested handle and position.
    pub handle: String,
    pub error: TranslationError,
}

impl Diagnostic {
    /// The same diagnostic reported from inside `prefix`.
    pub fn nested_under(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.handle = format!("{prefix}.{}", self.handle);
        }
        self
    }
}

/// A translation result together with the handles it had to skip.
#[derive(Debug, Clone, PartialEq)]
pub struct Translated<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Translated<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// True if nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.diagnostics.iter().map(|d| d.handle.as_str())
    }
}

/// Translates records for every target of one registry.
#[derive(Debug, Clone, Copy)]
pub struct RecordTranslator<'a> {
    registry: &'a MetadataRegistry,
}

impl<'a> RecordTranslator<'a> {
    pub fn new(registry: &'a MetadataRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a MetadataRegistry {
        self.registry
    }

    /// Reads a raw payload in `target`'s shape into a canonical record.
    ///
    /// Fails only for an unknown target.
    pub fn to_canonical(&self, raw: &Value, target: &str) -> TranslationResult<Translated<Record>> {
        let scope = self.registry.scope(Some(target))?;
        Ok(canonical_from_raw(raw, scope))
    }

    /// Writes a canonical record in `target`'s shape.
    pub fn from_canonical(&self, record: &Record, target: &str) -> TranslationResult<Translated<Value>> {
        let scope = self.registry.scope(Some(target))?;
        Ok(raw_from_canonical(record, scope, None))
    }

    /// Like [`from_canonical`](Self::from_canonical) but limited to `handles`,
    /// for expressing partial updates.
    pub fn from_canonical_handles(
        &self,
        record: &Record,
        target: &str,
        handles: &[&str],
    ) -> TranslationResult<Translated<Value>> {
        let scope = self.registry.scope(Some(target))?;
        Ok(raw_from_canonical(record, scope, Some(handles)))
    }

    /// A record holding the default of every handle readable in `target`.
    pub fn defaults_for(&self, target: &str) -> TranslationResult<Record> {
        let scope = self.registry.scope(Some(target))?;
        Ok(self
            .registry
            .handles()
            .filter(|h| scope.is_readable(h) && scope.path(h).is_some())
            .map(|h| (h.to_string(), scope.default_value(h)))
            .collect())
    }
}

fn type_context<'a>(scope: Scope<'a>, handle: &str) -> TypeContext<'a> {
    TypeContext::new(scope.registry().time_zones())
        .with_options(scope.enum_options(handle))
        .with_textual(scope.is_textual(handle))
}

/// Target and canonical structures of a nested handle.
fn structures<'a>(scope: Scope<'a>, handle: &str) -> (&'a Structure, &'a Structure) {
    let target = scope.structure(handle).unwrap_or(&DEFAULT_STRUCTURE);
    let canonical = scope.global().structure(handle).unwrap_or(&DEFAULT_STRUCTURE);
    (target, canonical)
}

fn report(handle: &str, error: TranslationError) -> Diagnostic {
    match &error {
        TranslationError::PathNotFound { .. } => {
            debug!(handle, %error, "handle absent from payload");
        }
        _ => warn!(handle, %error, "skipping handle"),
    }
    Diagnostic {
        handle: handle.to_string(),
        error,
    }
}

/// Flat handles first, then nested ones; both in declaration order.
fn partition<'a>(
    scope: Scope<'a>,
    include: impl Fn(&str) -> bool,
) -> (Vec<(&'a str, &'a str)>, Vec<(&'a str, &'a str)>) {
    let registry = scope.registry();
    let mut flat = Vec::new();
    let mut nested = Vec::new();
    for handle in registry.handles() {
        if !include(handle) {
            continue;
        }
        let Some(path) = scope.path(handle) else {
            continue;
        };
        if registry.sub_registry(handle).is_some() {
            nested.push((handle, path));
        } else {
            flat.push((handle, path));
        }
    }
    (flat, nested)
}

// ── Raw → canonical ──────────────────────────────────────────────

pub(crate) fn canonical_from_raw(raw: &Value, scope: Scope<'_>) -> Translated<Record> {
    let (flat, nested) = partition(scope, |h| scope.is_readable(h));
    let mut values: HashMap<&str, Value> = HashMap::new();
    let mut diagnostics = Vec::new();

    for (handle, locator) in flat {
        let result = path::get(raw, locator).and_then(|value| {
            types::normalize(scope.type_tag(handle), value, &type_context(scope, handle))
        });
        match result {
            Ok(value) => {
                values.insert(handle, value);
            }
            Err(error) => diagnostics.push(report(handle, error)),
        }
    }

    for (handle, locator) in nested {
        match read_nested(raw, locator, handle, scope) {
            Ok(translated) => {
                diagnostics.extend(
                    translated
                        .diagnostics
                        .into_iter()
                        .map(|d| d.nested_under(handle)),
                );
                values.insert(handle, translated.value);
            }
            Err(error) => diagnostics.push(report(handle, error)),
        }
    }

    let mut record = Map::new();
    for handle in scope.registry().handles() {
        if let Some(value) = values.remove(handle) {
            record.insert(handle.to_string(), value);
        }
    }
    Translated {
        value: record,
        diagnostics,
    }
}

fn read_nested(
    raw: &Value,
    locator: &str,
    handle: &str,
    scope: Scope<'_>,
) -> TranslationResult<Translated<Value>> {
    let value = path::get(raw, locator)?;
    let sub = scope
        .sub_scope(handle)
        .ok_or_else(|| TranslationError::Config(format!("{handle} has no sub-entity registry")))?;
    let (target, canonical) = structures(scope, handle);
    structure::check_compatible(canonical, target)?;
    match scope.forced_mapping(handle) {
        Some(mapping) => {
            let unforced = structure::unforce_mapping(value, mapping)?;
            structure::reconstruct(&unforced, target, sub)
        }
        None => structure::reconstruct(value, target, sub),
    }
}

// ── Canonical → raw ──────────────────────────────────────────────

pub(crate) fn raw_from_canonical(
    record: &Record,
    scope: Scope<'_>,
    only: Option<&[&str]>,
) -> Translated<Value> {
    let include = |h: &str| {
        scope.is_writable(h)
            && record.contains_key(h)
            && only.is_none_or(|handles| handles.contains(&h))
    };
    let (flat, nested) = partition(scope, include);
    let mut raw = Value::Object(Map::new());
    let mut diagnostics = Vec::new();

    for (handle, locator) in flat {
        let canonical = record.get(handle).unwrap_or(&Value::Null);
        let result = types::denormalize(scope.type_tag(handle), canonical, &type_context(scope, handle))
            .and_then(|value| path::set(&raw, locator, value, ContainerHint::Auto));
        match result {
            Ok(updated) => raw = updated,
            Err(error) => diagnostics.push(report(handle, error)),
        }
    }

    for (handle, locator) in nested {
        let canonical = record.get(handle).unwrap_or(&Value::Null);
        match write_nested(&raw, canonical, locator, handle, scope) {
            Ok(translated) => {
                diagnostics.extend(
                    translated
                        .diagnostics
                        .into_iter()
                        .map(|d| d.nested_under(handle)),
                );
                if let Some(updated) = translated.value {
                    raw = updated;
                }
            }
            Err(error) => diagnostics.push(report(handle, error)),
        }
    }

    Translated {
        value: raw,
        diagnostics,
    }
}

fn write_nested(
    raw: &Value,
    canonical: &Value,
    locator: &str,
    handle: &str,
    scope: Scope<'_>,
) -> TranslationResult<Translated<Option<Value>>> {
    let sub = scope
        .sub_scope(handle)
        .ok_or_else(|| TranslationError::Config(format!("{handle} has no sub-entity registry")))?;
    let (target, canonical_structure) = structures(scope, handle);
    structure::check_compatible(canonical_structure, target)?;
    let translated = structure::deconstruct(canonical, target, sub)?;
    let Some(mut shaped) = translated.value else {
        return Ok(Translated {
            value: None,
            diagnostics: translated.diagnostics,
        });
    };
    if let Some(mapping) = scope.forced_mapping(handle) {
        shaped = structure::force_mapping(&shaped, mapping)?;
    }
    let updated = path::set(raw, locator, shaped, ContainerHint::for_structure(Some(target)))?;
    Ok(Translated {
        value: Some(updated),
        diagnostics: translated.diagnostics,
    })
}
