//! Fuzzy equivalence of field values, dispatched by field category.
//!
//! Each [`ComparisonKind`] has one entry in a [`Comparators`] table. Adding a
//! category means adding an entry; existing comparators are untouched.

use fieldsync_schema::ComparisonKind;
use fieldsync_translate::types::{parse_currency, unescape_html};
use fieldsync_types::{is_blank, value_to_text};
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Decides whether two differing values mean the same thing.
pub trait Similarity: Send + Sync {
    fn similar(&self, a: &Value, b: &Value) -> bool;
}

impl<F> Similarity for F
where
    F: Fn(&Value, &Value) -> bool + Send + Sync,
{
    fn similar(&self, a: &Value, b: &Value) -> bool {
        self(a, b)
    }
}

/// The comparison table.
#[derive(Clone)]
pub struct Comparators {
    table: HashMap<ComparisonKind, Arc<dyn Similarity>>,
}

impl fmt::Debug for Comparators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparators")
            .field("kinds", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Comparators {
    fn default() -> Self {
        Self::empty()
            .with(ComparisonKind::Default, text_similar)
            .with(ComparisonKind::Phone, phone_similar)
            .with(ComparisonKind::PhonePreference, preference_similar)
            .with(ComparisonKind::Address, address_similar)
            .with(ComparisonKind::Url, url_similar)
            .with(ComparisonKind::Currency, currency_similar)
            .with(ComparisonKind::Markup, markup_similar)
    }
}

impl Comparators {
    /// A table with no entries; every kind falls back to [`text_similar`].
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Registers (or replaces) the comparator for a kind.
    #[must_use]
    pub fn with(mut self, kind: ComparisonKind, comparator: impl Similarity + 'static) -> Self {
        self.table.insert(kind, Arc::new(comparator));
        self
    }

    pub fn similar(&self, kind: ComparisonKind, a: &Value, b: &Value) -> bool {
        match self.table.get(&kind) {
            Some(comparator) => comparator.similar(a, b),
            None => text_similar(a, b),
        }
    }
}

/// Lowercases and collapses runs of whitespace.
pub fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case- and whitespace-insensitive equality of scalar renderings.
pub fn text_similar(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => a == b,
        _ => fold(&value_to_text(a)) == fold(&value_to_text(b)),
    }
}

fn digits(value: &Value) -> String {
    value_to_text(value)
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Number of trailing digits two phone numbers must share.
pub const PHONE_SUFFIX_DIGITS: usize = 8;

/// Compares the trailing digits, ignoring formatting and area/country codes.
pub fn phone_similar(a: &Value, b: &Value) -> bool {
    let (a, b) = (digits(a), digits(b));
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    let tail = |s: &str| s[s.len().saturating_sub(PHONE_SUFFIX_DIGITS)..].to_string();
    tail(&a) == tail(&b)
}

/// Folds yes/no style strings to a boolean; unknown text stays text.
fn truthiness(value: &Value) -> Result<bool, String> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => match fold(&value_to_text(other)).as_str() {
            "" | "0" | "n" | "no" | "false" | "off" => Ok(false),
            "1" | "y" | "yes" | "true" | "on" => Ok(true),
            text => Err(text.to_string()),
        },
    }
}

pub fn preference_similar(a: &Value, b: &Value) -> bool {
    truthiness(a) == truthiness(b)
}

const ADDRESS_ABBREVIATIONS: &[(&str, &str)] = &[
    ("street", "st"),
    ("road", "rd"),
    ("avenue", "ave"),
    ("drive", "dr"),
    ("court", "ct"),
    ("place", "pl"),
    ("lane", "ln"),
    ("highway", "hwy"),
    ("parade", "pde"),
    ("crescent", "cres"),
    ("boulevard", "blvd"),
    ("terrace", "tce"),
    ("unit", "u"),
    ("suite", "ste"),
    ("north", "n"),
    ("south", "s"),
    ("east", "e"),
    ("west", "w"),
];

/// Geocoding output that two systems routinely disagree on.
const ADDRESS_IGNORED_KEYS: &[&str] = &["lat", "lng", "latitude", "longitude"];

fn fold_address_text(value: &Value) -> String {
    fold(&value_to_text(value))
        .split(' ')
        .map(|word| word.trim_matches(|c: char| c == '.' || c == ','))
        .map(|word| {
            ADDRESS_ABBREVIATIONS
                .iter()
                .find(|(long, _)| *long == word)
                .map_or(word, |(_, short)| *short)
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Address lines or address objects, tolerant of abbreviations and geocoding.
pub fn address_similar(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            let keys = a
                .keys()
                .chain(b.keys())
                .filter(|k| !ADDRESS_IGNORED_KEYS.contains(&k.as_str()));
            for key in keys {
                let left = a.get(key).unwrap_or(&Value::Null);
                let right = b.get(key).unwrap_or(&Value::Null);
                if is_blank(left) && is_blank(right) {
                    continue;
                }
                if fold_address_text(left) != fold_address_text(right) {
                    return false;
                }
            }
            true
        }
        (Value::Object(_), _) | (_, Value::Object(_)) => false,
        _ => fold_address_text(a) == fold_address_text(b),
    }
}

static URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?://)?(?:www\.)?").expect("url pattern is valid"));

fn strip_url(value: &Value) -> String {
    let folded = fold(&value_to_text(value));
    URL_PREFIX
        .replace(&folded, "")
        .trim_end_matches('/')
        .to_string()
}

/// Equal up to protocol, a `www.` prefix and trailing slashes.
pub fn url_similar(a: &Value, b: &Value) -> bool {
    strip_url(a) == strip_url(b)
}

/// Numeric equality in minor units.
pub fn currency_similar(a: &Value, b: &Value) -> bool {
    match (parse_currency(a), parse_currency(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => text_similar(a, b),
    }
}

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][^<>]*>").expect("tag pattern is valid")
});

/// Removes tags and decodes entities.
///
/// A `<` that does not open a tag is text.
pub fn strip_markup(text: &str) -> String {
    unescape_html(&TAG.replace_all(text, " "))
}

/// Equal once markup and whitespace differences are ignored.
pub fn markup_similar(a: &Value, b: &Value) -> bool {
    fold(&strip_markup(&value_to_text(a))) == fold(&strip_markup(&value_to_text(b)))
}
