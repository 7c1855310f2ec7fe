//! Structure translation for nested sub-entities.
//!
//! Canonically a nested handle holds either one sub-record (when its global
//! structure is singular) or a list of sub-records. A target may embed those
//! sub-records as objects, project a single field out of each, or key them by
//! one of their fields; see [`Structure`].

use crate::error::{kind_of, TranslationError, TranslationResult};
use crate::record::{self, Diagnostic, Translated};
use crate::types::{self, TypeContext};
use fieldsync_schema::{ForcedMapping, Scope, Structure};
use fieldsync_types::{is_blank, value_to_text, Record};
use serde_json::{Map, Value};
use tracing::warn;

/// Structure assumed for nested handles that declare none.
pub static DEFAULT_STRUCTURE: Structure = Structure::ListedObjects;

/// Fails unless both structures agree on singularity.
pub fn check_compatible(canonical: &Structure, target: &Structure) -> TranslationResult<()> {
    if canonical.is_singular() == target.is_singular() {
        Ok(())
    } else {
        Err(TranslationError::StructureMismatch {
            from: canonical.to_string(),
            to: target.to_string(),
        })
    }
}

/// The target form of "no sub-entities".
pub fn empty_form(structure: &Structure) -> Option<Value> {
    if structure.is_listed() {
        Some(Value::Array(Vec::new()))
    } else if structure.is_mapped() {
        Some(Value::Object(Map::new()))
    } else {
        None
    }
}

fn shape_error(expected: &str, found: &Value) -> TranslationError {
    TranslationError::UnexpectedShape {
        expected: expected.to_string(),
        found: kind_of(found).to_string(),
    }
}

fn duplicate_key(structure: &Structure, key: &str, position: usize) -> Diagnostic {
    Diagnostic {
        handle: structure.key_handle().unwrap_or_default().to_string(),
        error: TranslationError::UnexpectedShape {
            expected: "a unique mapping key".to_string(),
            found: format!("duplicate key {key}"),
        },
    }
    .nested_under(&position.to_string())
}

fn prefixed(prefix: &str, diagnostics: Vec<Diagnostic>) -> impl Iterator<Item = Diagnostic> + '_ {
    diagnostics
        .into_iter()
        .map(move |d| d.nested_under(prefix))
}

// ── Canonical → target ───────────────────────────────────────────

/// Expresses canonical sub-records in a target structure.
///
/// Blank input yields the structure's empty form, `None` for singular
/// structures meaning the field is omitted.
pub fn deconstruct(
    canonical: &Value,
    structure: &Structure,
    sub: Scope<'_>,
) -> TranslationResult<Translated<Option<Value>>> {
    if is_blank(canonical) {
        return Ok(Translated::new(empty_form(structure)));
    }
    let mut diagnostics = Vec::new();

    let value = if structure.is_singular() {
        let record = canonical
            .as_object()
            .ok_or_else(|| shape_error("a sub-record", canonical))?;
        embed(record, structure, sub, "", &mut diagnostics)?
    } else {
        let records = canonical
            .as_array()
            .ok_or_else(|| shape_error("a list of sub-records", canonical))?;
        if structure.is_listed() {
            let mut items = Vec::with_capacity(records.len());
            for (i, item) in records.iter().enumerate() {
                let record = item
                    .as_object()
                    .ok_or_else(|| shape_error("a sub-record", item))?;
                items.push(embed(record, structure, sub, &i.to_string(), &mut diagnostics)?);
            }
            Value::Array(items)
        } else {
            let mut map = Map::new();
            for (i, item) in records.iter().enumerate() {
                let record = item
                    .as_object()
                    .ok_or_else(|| shape_error("a sub-record", item))?;
                let key = mapping_key(record, structure, sub)?;
                // The first sub-record under a key wins; later ones are reported.
                if map.contains_key(&key) {
                    warn!(key = %key, position = i, "duplicate mapping key");
                    diagnostics.push(duplicate_key(structure, &key, i));
                    continue;
                }
                let value = embed(record, structure, sub, &key, &mut diagnostics)?;
                map.insert(key, value);
            }
            Value::Object(map)
        }
    };

    Ok(Translated {
        value: Some(value),
        diagnostics,
    })
}

fn embed(
    record: &Record,
    structure: &Structure,
    sub: Scope<'_>,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> TranslationResult<Value> {
    match structure.value_handle() {
        None => {
            let translated = record::raw_from_canonical(record, sub, None);
            diagnostics.extend(prefixed(prefix, translated.diagnostics));
            Ok(translated.value)
        }
        Some(handle) => {
            let value = record.get(handle).unwrap_or(&Value::Null);
            types::denormalize(sub.type_tag(handle), value, &context(sub, handle))
        }
    }
}

fn mapping_key(record: &Record, structure: &Structure, sub: Scope<'_>) -> TranslationResult<String> {
    let handle = structure.key_handle().unwrap_or_default();
    let value = record
        .get(handle)
        .filter(|v| !v.is_null())
        .ok_or_else(|| TranslationError::UnexpectedShape {
            expected: format!("a value for mapping key {handle}"),
            found: "null".into(),
        })?;
    let raw = types::denormalize(sub.type_tag(handle), value, &context(sub, handle))?;
    Ok(value_to_text(&raw))
}

fn context<'a>(sub: Scope<'a>, handle: &str) -> TypeContext<'a> {
    TypeContext::new(sub.registry().time_zones())
        .with_options(sub.enum_options(handle))
        .with_textual(sub.is_textual(handle))
}

// ── Target → canonical ───────────────────────────────────────────

/// Reads sub-records out of a target structure.
///
/// Returns one sub-record (or null) for singular structures and a list for
/// the rest, in the order the target presents them.
pub fn reconstruct(
    raw: &Value,
    structure: &Structure,
    sub: Scope<'_>,
) -> TranslationResult<Translated<Value>> {
    if is_blank(raw) {
        let empty = if structure.is_singular() {
            Value::Null
        } else {
            Value::Array(Vec::new())
        };
        return Ok(Translated::new(empty));
    }
    let mut diagnostics = Vec::new();

    let value = if structure.is_singular() {
        Value::Object(extract(raw, None, structure, sub, "", &mut diagnostics)?)
    } else if structure.is_listed() {
        let items = raw
            .as_array()
            .ok_or_else(|| shape_error("a list", raw))?;
        let mut records = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let record = extract(item, None, structure, sub, &i.to_string(), &mut diagnostics)?;
            records.push(Value::Object(record));
        }
        Value::Array(records)
    } else {
        let entries = raw
            .as_object()
            .ok_or_else(|| shape_error("a mapping", raw))?;
        let mut records = Vec::with_capacity(entries.len());
        for (key, item) in entries {
            let record = extract(item, Some(key), structure, sub, key, &mut diagnostics)?;
            records.push(Value::Object(record));
        }
        Value::Array(records)
    };

    Ok(Translated { value, diagnostics })
}

fn extract(
    item: &Value,
    key: Option<&str>,
    structure: &Structure,
    sub: Scope<'_>,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> TranslationResult<Record> {
    let mut fields = Map::new();

    if let (Some(key), Some(handle)) = (key, structure.key_handle()) {
        let value = types::normalize(
            sub.type_tag(handle),
            &Value::String(key.to_string()),
            &context(sub, handle),
        )?;
        fields.insert(handle.to_string(), value);
    }

    match structure.value_handle() {
        None => {
            if !item.is_object() {
                return Err(shape_error("an embedded object", item));
            }
            let translated = record::canonical_from_raw(item, sub);
            diagnostics.extend(prefixed(prefix, translated.diagnostics));
            for (handle, value) in translated.value {
                // The mapping key wins over a conflicting embedded copy.
                fields.entry(handle).or_insert(value);
            }
        }
        Some(handle) => {
            let value = types::normalize(sub.type_tag(handle), item, &context(sub, handle))?;
            fields.insert(handle.to_string(), value);
        }
    }

    Ok(in_declaration_order(sub, fields))
}

fn in_declaration_order(sub: Scope<'_>, mut fields: Record) -> Record {
    let mut ordered = Map::new();
    for handle in sub.registry().handles() {
        if let Some(value) = fields.remove(handle) {
            ordered.insert(handle.to_string(), value);
        }
    }
    ordered
}

// ── Forced mappings ──────────────────────────────────────────────

/// Re-keys a list of objects by one of their fields.
///
/// With `value` set, each entry holds only that field; otherwise the whole
/// object. A non-list input is returned unchanged.
pub fn force_mapping(value: &Value, mapping: &ForcedMapping) -> TranslationResult<Value> {
    let Value::Array(items) = value else {
        return Ok(value.clone());
    };
    let mut map = Map::new();
    for item in items {
        let object = item
            .as_object()
            .ok_or_else(|| shape_error("an object to re-key", item))?;
        let key = object
            .get(&mapping.key)
            .map(value_to_text)
            .ok_or_else(|| TranslationError::UnexpectedShape {
                expected: format!("a {} field", mapping.key),
                found: "an object without it".into(),
            })?;
        let entry = match &mapping.value {
            Some(field) => object.get(field).cloned().unwrap_or(Value::Null),
            None => item.clone(),
        };
        map.insert(key, entry);
    }
    Ok(Value::Object(map))
}

/// Undoes [`force_mapping`], restoring the key field on each entry.
pub fn unforce_mapping(value: &Value, mapping: &ForcedMapping) -> TranslationResult<Value> {
    let Value::Object(map) = value else {
        return Ok(value.clone());
    };
    let mut items = Vec::with_capacity(map.len());
    for (key, entry) in map {
        let mut object = Map::new();
        match (&mapping.value, entry) {
            (None, Value::Object(fields)) if fields.contains_key(&mapping.key) => {
                object = fields.clone();
            }
            (None, Value::Object(fields)) => {
                object.insert(mapping.key.clone(), Value::String(key.clone()));
                object.extend(fields.clone());
            }
            (Some(field), entry) => {
                object.insert(mapping.key.clone(), Value::String(key.clone()));
                object.insert(field.clone(), entry.clone());
            }
            (None, other) => return Err(shape_error("an object entry", other)),
        }
        items.push(Value::Object(object));
    }
    Ok(Value::Array(items))
}
