//! The canonical record representation.

use serde_json::Value;

/// A canonical record: an ordered mapping from handle to value.
///
/// Values may be scalars, nested canonical records (`Value::Object`) or lists
/// of canonical records. Ordering follows insertion, which the record
/// translator keeps aligned with registry declaration order.
pub type Record = serde_json::Map<String, Value>;

/// Returns true if a value carries no information.
///
/// Null, empty or whitespace-only strings, and empty arrays/objects are blank.
/// `false` and `0` are not: they are deliberate values.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Renders a scalar value as plain text.
///
/// Strings are returned unquoted; null becomes the empty string; containers
/// fall back to their JSON encoding.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
