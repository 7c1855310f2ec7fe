//! Type normalization.
//!
//! Every [`TypeTag`] maps to one named `parse_*` function (raw → canonical)
//! and, where the raw spelling differs from the canonical one, one named
//! `format_*` function (canonical → raw). [`normalize`] and [`denormalize`]
//! only dispatch; no tag semantics live in the dispatchers.
//!
//! Blank raw values (null or the empty string) normalize to null for every
//! tag except `string`, so a missing date is not mistaken for the epoch.

use crate::error::{kind_of, TranslationError, TranslationResult};
use crate::php;
use chrono::{DateTime, Utc};
use fieldsync_schema::TypeTag;
use regex_lite::{Captures, Regex};
use fieldsync_types::{time, value_to_text, TimeZones};
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;

/// What a conversion may need beyond the value itself.
#[derive(Debug, Clone, Copy)]
pub struct TypeContext<'a> {
    pub zones: &'a TimeZones,
    /// Allowed members, for `enum` fields.
    pub options: Option<&'a [String]>,
    /// Write scalars back as text.
    pub textual: bool,
}

impl<'a> TypeContext<'a> {
    pub fn new(zones: &'a TimeZones) -> Self {
        Self {
            zones,
            options: None,
            textual: false,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Option<&'a [String]>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_textual(mut self, textual: bool) -> Self {
        self.textual = textual;
        self
    }
}

fn coercion(tag: TypeTag, value: &Value, reason: impl Into<String>) -> TranslationError {
    TranslationError::Coercion {
        tag: tag.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn is_empty_raw(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Converts a raw value to its canonical form.
///
/// A missing tag is the identity.
pub fn normalize(tag: Option<TypeTag>, raw: &Value, ctx: &TypeContext<'_>) -> TranslationResult<Value> {
    let Some(tag) = tag else {
        return Ok(raw.clone());
    };
    if tag != TypeTag::String && is_empty_raw(raw) {
        return Ok(Value::Null);
    }
    match tag {
        TypeTag::String => to_string_value(raw),
        TypeTag::Int => parse_int(raw),
        TypeTag::Float => parse_float(raw),
        TypeTag::Currency => parse_currency(raw),
        TypeTag::Boolean => parse_bool(raw),
        TypeTag::Yesno => parse_yesno(raw),
        TypeTag::Iso8601Utc
        | TypeTag::WpDatetime
        | TypeTag::ActDatetime
        | TypeTag::XeroDatetime
        | TypeTag::GdriveDatetime
        | TypeTag::Timestamp => parse_datetime(tag, raw, ctx.zones),
        TypeTag::PhpArrayAssociative => parse_php_associative(raw),
        TypeTag::PhpArrayIndexed => parse_php_indexed(raw),
        TypeTag::Uri => parse_uri(raw),
        TypeTag::Enum => validate_enum(raw, ctx.options),
        TypeTag::HtmlEscaped => parse_html_escaped(raw),
    }
}

/// Converts a canonical value back to its raw form.
///
/// Null stays null for every tag.
pub fn denormalize(
    tag: Option<TypeTag>,
    canonical: &Value,
    ctx: &TypeContext<'_>,
) -> TranslationResult<Value> {
    let Some(tag) = tag else {
        return Ok(canonical.clone());
    };
    if canonical.is_null() {
        return Ok(Value::Null);
    }
    match tag {
        TypeTag::String => Ok(canonical.clone()),
        TypeTag::Int | TypeTag::Float if ctx.textual => format_number_text(tag, canonical),
        TypeTag::Boolean if ctx.textual => format_bool_text(canonical),
        TypeTag::Int | TypeTag::Float | TypeTag::Boolean => Ok(canonical.clone()),
        TypeTag::Currency => format_currency(canonical),
        TypeTag::Yesno => format_yesno(canonical),
        TypeTag::Iso8601Utc
        | TypeTag::WpDatetime
        | TypeTag::ActDatetime
        | TypeTag::XeroDatetime
        | TypeTag::GdriveDatetime
        | TypeTag::Timestamp => format_datetime(tag, canonical, ctx.zones),
        TypeTag::PhpArrayAssociative | TypeTag::PhpArrayIndexed => format_php_array(tag, canonical),
        TypeTag::Uri => parse_uri(canonical),
        TypeTag::Enum => validate_enum(canonical, ctx.options),
        TypeTag::HtmlEscaped => format_html_escaped(canonical),
    }
}

// ── Scalars ──────────────────────────────────────────────────────

/// Renders any scalar as a string; null stays null.
pub fn to_string_value(raw: &Value) -> TranslationResult<Value> {
    match raw {
        Value::Null => Ok(Value::Null),
        Value::Array(_) | Value::Object(_) => Err(coercion(
            TypeTag::String,
            raw,
            format!("{} is not a scalar", kind_of(raw)),
        )),
        other => Ok(Value::String(value_to_text(other))),
    }
}

pub fn parse_int(raw: &Value) -> TranslationResult<Value> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    parsed
        .map(Value::from)
        .ok_or_else(|| coercion(TypeTag::Int, raw, "not an integer"))
}

pub fn parse_float(raw: &Value) -> TranslationResult<Value> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| coercion(TypeTag::Float, raw, "not a finite number"))
}

/// Parses a decimal amount into integer minor units.
///
/// Currency symbols, thousands separators and whitespace are ignored.
pub fn parse_currency(raw: &Value) -> TranslationResult<Value> {
    let amount = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | '£' | '€') && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    amount
        .filter(|f| f.is_finite())
        .map(|f| Value::from((f * 100.0).round() as i64))
        .ok_or_else(|| coercion(TypeTag::Currency, raw, "not an amount"))
}

/// Formats minor units as a two-decimal amount, e.g. `1250` → `"12.50"`.
pub fn format_currency(canonical: &Value) -> TranslationResult<Value> {
    let cents = canonical
        .as_i64()
        .ok_or_else(|| coercion(TypeTag::Currency, canonical, "expected integer minor units"))?;
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    Ok(Value::String(format!("{sign}{}.{:02}", abs / 100, abs % 100)))
}

pub fn parse_bool(raw: &Value) -> TranslationResult<Value> {
    let parsed = match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Value::Bool)
        .ok_or_else(|| coercion(TypeTag::Boolean, raw, "not a boolean"))
}

/// Spells a number the way a text cell holds it; whole floats drop `.0`.
pub fn format_number_text(tag: TypeTag, canonical: &Value) -> TranslationResult<Value> {
    match canonical {
        Value::Number(n) => Ok(Value::String(match n.as_f64() {
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        })),
        other => Err(coercion(tag, other, format!("{} is not a number", kind_of(other)))),
    }
}

/// Spells a boolean as `"1"` or `"0"`.
pub fn format_bool_text(canonical: &Value) -> TranslationResult<Value> {
    match canonical {
        Value::Bool(b) => Ok(Value::String(if *b { "1" } else { "0" }.to_string())),
        other => Err(coercion(TypeTag::Boolean, other, format!("{} is not a boolean", kind_of(other)))),
    }
}

pub fn parse_yesno(raw: &Value) -> TranslationResult<Value> {
    let parsed = match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Some(true),
            "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Value::Bool)
        .ok_or_else(|| coercion(TypeTag::Yesno, raw, "expected yes or no"))
}

pub fn format_yesno(canonical: &Value) -> TranslationResult<Value> {
    match canonical {
        Value::Bool(true) => Ok(Value::String("yes".into())),
        Value::Bool(false) => Ok(Value::String("no".into())),
        other => Err(coercion(TypeTag::Yesno, other, "expected a boolean")),
    }
}

// ── Datetimes ────────────────────────────────────────────────────

fn raw_text(tag: TypeTag, raw: &Value) -> TranslationResult<&str> {
    raw.as_str()
        .ok_or_else(|| coercion(tag, raw, format!("expected a string, found {}", kind_of(raw))))
}

/// Parses a raw datetime in the tag's zone into canonical RFC 3339 UTC.
pub fn parse_datetime(tag: TypeTag, raw: &Value, zones: &TimeZones) -> TranslationResult<Value> {
    let parsed: fieldsync_types::Result<DateTime<Utc>> = match tag {
        TypeTag::Iso8601Utc => time::parse_iso8601_utc(raw_text(tag, raw)?),
        TypeTag::WpDatetime => time::parse_wp_datetime(raw_text(tag, raw)?, zones),
        TypeTag::ActDatetime => time::parse_act_datetime(raw_text(tag, raw)?, zones),
        TypeTag::XeroDatetime => time::parse_xero_datetime(raw_text(tag, raw)?),
        TypeTag::GdriveDatetime => time::parse_gdrive_datetime(raw_text(tag, raw)?, zones),
        TypeTag::Timestamp => time::parse_timestamp(raw),
        other => return Err(coercion(other, raw, "not a datetime tag")),
    };
    parsed
        .map(|dt| Value::String(time::to_canonical(dt)))
        .map_err(|err| coercion(tag, raw, err.to_string()))
}

/// Formats a canonical datetime in the tag's raw spelling and zone.
pub fn format_datetime(tag: TypeTag, canonical: &Value, zones: &TimeZones) -> TranslationResult<Value> {
    let text = raw_text(tag, canonical)?;
    let dt = time::parse_canonical(text).map_err(|err| coercion(tag, canonical, err.to_string()))?;
    Ok(match tag {
        TypeTag::Iso8601Utc => Value::String(time::format_iso8601_utc(dt)),
        TypeTag::WpDatetime => Value::String(time::format_wp_datetime(dt, zones)),
        TypeTag::ActDatetime => Value::String(time::format_act_datetime(dt, zones)),
        TypeTag::XeroDatetime => Value::String(time::format_xero_datetime(dt, zones)),
        TypeTag::GdriveDatetime => Value::String(time::format_gdrive_datetime(dt, zones)),
        TypeTag::Timestamp => time::format_timestamp(dt),
        other => return Err(coercion(other, canonical, "not a datetime tag")),
    })
}

// ── Serialized arrays ────────────────────────────────────────────

fn unserialize(tag: TypeTag, raw: &Value) -> TranslationResult<Value> {
    match raw {
        Value::String(s) => php::unserialize(s).map_err(|err| coercion(tag, raw, err.to_string())),
        Value::Object(_) | Value::Array(_) => Ok(raw.clone()),
        other => Err(coercion(tag, other, "expected a serialized array")),
    }
}

/// Decodes a serialized associative array into an ordered mapping.
pub fn parse_php_associative(raw: &Value) -> TranslationResult<Value> {
    match unserialize(TypeTag::PhpArrayAssociative, raw)? {
        Value::Array(items) => Ok(Value::Object(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect::<Map<_, _>>(),
        )),
        Value::Object(map) => Ok(Value::Object(map)),
        other => Err(coercion(TypeTag::PhpArrayAssociative, &other, "not an array")),
    }
}

/// Decodes a serialized indexed array into a list, ordered as serialized.
pub fn parse_php_indexed(raw: &Value) -> TranslationResult<Value> {
    match unserialize(TypeTag::PhpArrayIndexed, raw)? {
        Value::Array(items) => Ok(Value::Array(items)),
        Value::Object(map) => Ok(Value::Array(map.into_iter().map(|(_, v)| v).collect())),
        other => Err(coercion(TypeTag::PhpArrayIndexed, &other, "not an array")),
    }
}

pub fn format_php_array(tag: TypeTag, canonical: &Value) -> TranslationResult<Value> {
    match canonical {
        Value::Array(_) | Value::Object(_) => Ok(Value::String(php::serialize(canonical))),
        other => Err(coercion(tag, other, "expected a list or mapping")),
    }
}

// ── Text ─────────────────────────────────────────────────────────

pub fn parse_uri(raw: &Value) -> TranslationResult<Value> {
    raw_text(TypeTag::Uri, raw).map(|s| Value::String(s.trim().to_string()))
}

/// Accepts a value only if it is one of `options`. No options allows any.
pub fn validate_enum(raw: &Value, options: Option<&[String]>) -> TranslationResult<Value> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(_) | Value::Bool(_) => value_to_text(raw),
        other => return Err(coercion(TypeTag::Enum, other, "not a scalar")),
    };
    match options {
        Some(options) if !options.iter().any(|o| *o == text) => Err(coercion(
            TypeTag::Enum,
            raw,
            format!("not one of {}", options.join(", ")),
        )),
        _ => Ok(Value::String(text)),
    }
}

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(amp|lt|gt|quot|apos|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});")
        .expect("entity pattern is valid")
});

/// Unescapes the five HTML entities plus decimal and hex character references.
///
/// Anything that is not a recognised entity is left as written.
pub fn unescape_html(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

pub fn parse_html_escaped(raw: &Value) -> TranslationResult<Value> {
    raw_text(TypeTag::HtmlEscaped, raw).map(|s| Value::String(unescape_html(s)))
}

pub fn format_html_escaped(canonical: &Value) -> TranslationResult<Value> {
    raw_text(TypeTag::HtmlEscaped, canonical).map(|s| Value::String(escape_html(s)))
}
