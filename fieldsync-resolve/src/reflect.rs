//! Per-category canonicalization of reflective fields.
//!
//! A reflective field is rewritten on each side through its category's
//! reflector before the sides are compared. A side whose value changes is
//! patched with itself, so both systems converge on the tidy spelling.

use crate::similarity::strip_markup;
use fieldsync_schema::ComparisonKind;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Rewrites a value into its tidy form; must be idempotent.
pub type Reflector = fn(&Value) -> Value;

/// The reflection table.
#[derive(Debug, Clone)]
pub struct Reflectors {
    table: HashMap<ComparisonKind, Reflector>,
}

impl Default for Reflectors {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
        }
        .with(ComparisonKind::Default, reflect_text)
        .with(ComparisonKind::Phone, reflect_phone)
        .with(ComparisonKind::PhonePreference, reflect_text)
        .with(ComparisonKind::Address, reflect_address)
        .with(ComparisonKind::Url, reflect_url)
        .with(ComparisonKind::Markup, reflect_markup)
    }
}

impl Reflectors {
    #[must_use]
    pub fn with(mut self, kind: ComparisonKind, reflector: Reflector) -> Self {
        self.table.insert(kind, reflector);
        self
    }

    /// The reflector for a kind; kinds without one are left untouched.
    pub fn get(&self, kind: ComparisonKind) -> Option<Reflector> {
        self.table.get(&kind).copied()
    }

    pub fn reflect(&self, kind: ComparisonKind, value: &Value) -> Value {
        match self.get(kind) {
            Some(reflector) => reflector(value),
            None => value.clone(),
        }
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn map_string(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

/// Trims and collapses internal whitespace.
pub fn reflect_text(value: &Value) -> Value {
    map_string(value, collapse)
}

/// Keeps digits, `+` and single spaces.
pub fn reflect_phone(value: &Value) -> Value {
    map_string(value, |s| {
        let kept: String = s
            .chars()
            .map(|c| if c.is_ascii_digit() || c == '+' { c } else { ' ' })
            .collect();
        collapse(&kept)
    })
}

/// Tidies every text member and drops empty ones.
pub fn reflect_address(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let tidy: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), reflect_text(v)))
                .filter(|(_, v)| !matches!(v, Value::String(s) if s.is_empty()))
                .collect();
            Value::Object(tidy)
        }
        other => reflect_text(other),
    }
}

/// Trims and lowercases the scheme and host.
pub fn reflect_url(value: &Value) -> Value {
    map_string(value, |s| {
        let trimmed = s.trim();
        let Some((scheme, rest)) = trimmed.split_once("://") else {
            return trimmed.to_string();
        };
        let (host, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        format!("{}://{}{}", scheme.to_lowercase(), host.to_lowercase(), path)
    })
}

/// Trims whitespace around markup without touching the markup itself.
pub fn reflect_markup(value: &Value) -> Value {
    match value {
        Value::String(s) if strip_markup(s).trim().is_empty() => Value::String(String::new()),
        other => map_string(other, |s| s.trim().to_string()),
    }
}
