//! Path locators into nested payloads.
//!
//! A path is a dotted and/or bracketed locator such as `media_details.width`,
//! `meta.0.value`, `meta[0].value` or `attributes["pa_size"]`. All-digit
//! segments are indices; they also address mapping keys spelled as digits,
//! since PHP-backed APIs freely mix the two.
//!
//! [`set`] is copy-on-write: the input is never mutated.

use crate::error::{kind_of, TranslationError, TranslationResult};
use fieldsync_schema::Structure;
use serde_json::{Map, Value};

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    fn from_bare(text: &str) -> Self {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = text.parse() {
                return Segment::Index(index);
            }
        }
        Segment::Key(text.to_string())
    }

    fn as_key(&self) -> String {
        match self {
            Segment::Key(key) => key.clone(),
            Segment::Index(index) => index.to_string(),
        }
    }
}

/// Which container to create for a missing intermediate indexed by position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainerHint {
    /// Index segments create lists, key segments create mappings.
    #[default]
    Auto,
    /// Always create mappings, keying positions by their decimal spelling.
    Mapping,
}

impl ContainerHint {
    /// The hint in effect for a handle with the given structure.
    pub fn for_structure(structure: Option<&Structure>) -> Self {
        match structure {
            Some(s) if s.is_mapped() => ContainerHint::Mapping,
            _ => ContainerHint::Auto,
        }
    }
}

/// Largest list position [`set`] will grow a list to reach.
pub const MAX_INDEX: usize = 9_999;

fn invalid(path: &str, reason: &str) -> TranslationError {
    TranslationError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses a locator into segments.
pub fn parse_path(path: &str) -> TranslationResult<Vec<Segment>> {
    if path.is_empty() {
        return Err(invalid(path, "empty path"));
    }
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    // True right after a closing bracket, where a bare segment may not start.
    let mut after_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if current.is_empty() && !after_bracket {
                    return Err(invalid(path, "empty segment"));
                }
                if !current.is_empty() {
                    segments.push(Segment::from_bare(&current));
                    current.clear();
                }
                after_bracket = false;
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::from_bare(&current));
                    current.clear();
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(invalid(path, "unterminated bracket"));
                }
                segments.push(bracketed(path, &inner)?);
                after_bracket = true;
                if chars.peek().is_some_and(|c| *c != '.' && *c != '[') {
                    return Err(invalid(path, "text after closing bracket"));
                }
            }
            other => {
                after_bracket = false;
                current.push(other);
            }
        }
    }

    if !current.is_empty() {
        segments.push(Segment::from_bare(&current));
    } else if !after_bracket {
        return Err(invalid(path, "trailing separator"));
    }
    Ok(segments)
}

fn bracketed(path: &str, inner: &str) -> TranslationResult<Segment> {
    let trimmed = inner.trim();
    for quote in ['"', '\''] {
        if let Some(key) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Ok(Segment::Key(key.to_string()));
        }
    }
    if trimmed.is_empty() {
        return Err(invalid(path, "empty brackets"));
    }
    Ok(Segment::from_bare(trimmed))
}

/// Reads the value at `path`.
///
/// Fails with [`TranslationError::PathNotFound`] if any segment is absent;
/// a present null is returned as `Value::Null`.
pub fn get<'v>(data: &'v Value, path: &str) -> TranslationResult<&'v Value> {
    let segments = parse_path(path)?;
    let mut current = data;
    for segment in &segments {
        current = step(current, segment).ok_or_else(|| TranslationError::PathNotFound {
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

fn step<'v>(value: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match (value, segment) {
        (Value::Object(map), segment) => map.get(&segment.as_key()),
        (Value::Array(items), Segment::Index(i)) => items.get(*i),
        _ => None,
    }
}

/// Returns a copy of `data` with `value` written at `path`.
///
/// Missing intermediate containers are created per `hint`. Writing through a
/// scalar is refused rather than clobbering it.
pub fn set(
    data: &Value,
    path: &str,
    value: Value,
    hint: ContainerHint,
) -> TranslationResult<Value> {
    let segments = parse_path(path)?;
    let mut copy = data.clone();
    set_in(&mut copy, path, &segments, value, hint)?;
    Ok(copy)
}

fn empty_container(segment: &Segment, hint: ContainerHint) -> Value {
    match (segment, hint) {
        (Segment::Index(_), ContainerHint::Auto) => Value::Array(Vec::new()),
        _ => Value::Object(Map::new()),
    }
}

fn set_in(
    target: &mut Value,
    path: &str,
    segments: &[Segment],
    value: Value,
    hint: ContainerHint,
) -> TranslationResult<()> {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };
    if target.is_null() {
        *target = empty_container(head, hint);
    }

    let slot = match (target, head) {
        (Value::Object(map), segment) => map.entry(segment.as_key()).or_insert(Value::Null),
        (Value::Array(items), Segment::Index(i)) => {
            if *i > MAX_INDEX {
                return Err(invalid(path, &format!("index {i} exceeds {MAX_INDEX}")));
            }
            if *i >= items.len() {
                items.resize(*i + 1, Value::Null);
            }
            &mut items[*i]
        }
        (other, segment) => {
            return Err(TranslationError::UnexpectedShape {
                expected: format!("a container for segment {}", segment.as_key()),
                found: kind_of(other).to_string(),
            });
        }
    };

    if !rest.is_empty() && slot.is_null() {
        *slot = empty_container(&rest[0], hint);
    }
    set_in(slot, path, rest, value, hint)
}
