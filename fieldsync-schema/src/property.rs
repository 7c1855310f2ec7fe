//! Field properties and the closed tag sets they draw from.

use fieldsync_types::Side;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The canonical type of a field's value.
///
/// Several unrelated fields share a tag; each tag maps to one named
/// normalize/denormalize pair in the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    String,
    Int,
    Float,
    Currency,
    Boolean,
    Yesno,
    Iso8601Utc,
    WpDatetime,
    ActDatetime,
    XeroDatetime,
    GdriveDatetime,
    Timestamp,
    PhpArrayAssociative,
    PhpArrayIndexed,
    Uri,
    Enum,
    HtmlEscaped,
}

impl TypeTag {
    pub fn is_datetime(self) -> bool {
        matches!(
            self,
            TypeTag::Iso8601Utc
                | TypeTag::WpDatetime
                | TypeTag::ActDatetime
                | TypeTag::XeroDatetime
                | TypeTag::GdriveDatetime
                | TypeTag::Timestamp
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Currency => "currency",
            TypeTag::Boolean => "boolean",
            TypeTag::Yesno => "yesno",
            TypeTag::Iso8601Utc => "iso8601_utc",
            TypeTag::WpDatetime => "wp_datetime",
            TypeTag::ActDatetime => "act_datetime",
            TypeTag::XeroDatetime => "xero_datetime",
            TypeTag::GdriveDatetime => "gdrive_datetime",
            TypeTag::Timestamp => "timestamp",
            TypeTag::PhpArrayAssociative => "php_array_associative",
            TypeTag::PhpArrayIndexed => "php_array_indexed",
            TypeTag::Uri => "uri",
            TypeTag::Enum => "enum",
            TypeTag::HtmlEscaped => "html_escaped",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a sub-entity (or collection of them) is embedded in a shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Structure {
    /// One nested object.
    SingularObject,
    /// One scalar: the sub-entity's `value` field.
    SingularValue { value: String },
    /// A list of nested objects.
    ListedObjects,
    /// A list of scalars projected from each sub-entity's `value` field.
    ListedValues { value: String },
    /// Objects keyed by each sub-entity's `key` field.
    MappingObject { key: String },
    /// Scalars keyed by `key`, projected from `value`.
    MappingValue { key: String, value: String },
}

impl Structure {
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            Structure::SingularObject | Structure::SingularValue { .. }
        )
    }

    pub fn is_listed(&self) -> bool {
        matches!(
            self,
            Structure::ListedObjects | Structure::ListedValues { .. }
        )
    }

    pub fn is_mapped(&self) -> bool {
        matches!(
            self,
            Structure::MappingObject { .. } | Structure::MappingValue { .. }
        )
    }

    /// True if sub-entities are embedded whole rather than projected.
    pub fn embeds_objects(&self) -> bool {
        matches!(
            self,
            Structure::SingularObject | Structure::ListedObjects | Structure::MappingObject { .. }
        )
    }

    /// The projected value handle, if any.
    pub fn value_handle(&self) -> Option<&str> {
        match self {
            Structure::SingularValue { value }
            | Structure::ListedValues { value }
            | Structure::MappingValue { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The mapping key handle, if any.
    pub fn key_handle(&self) -> Option<&str> {
        match self {
            Structure::MappingObject { key } | Structure::MappingValue { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Structure::SingularObject => write!(f, "singular-object"),
            Structure::SingularValue { value } => write!(f, "singular-value({value})"),
            Structure::ListedObjects => write!(f, "listed-objects"),
            Structure::ListedValues { value } => write!(f, "listed-values({value})"),
            Structure::MappingObject { key } => write!(f, "mapping-object({key})"),
            Structure::MappingValue { key, value } => write!(f, "mapping-value({key},{value})"),
        }
    }
}

/// Whether and how a field is synchronised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    Off,
    Normal,
    OverrideMaster,
    OverrideSlave,
}

impl SyncMode {
    pub fn is_active(self) -> bool {
        !matches!(self, SyncMode::Off)
    }

    /// The side that always wins, for override modes.
    pub fn override_side(self) -> Option<Side> {
        match self {
            SyncMode::OverrideMaster => Some(Side::Master),
            SyncMode::OverrideSlave => Some(Side::Slave),
            SyncMode::Off | SyncMode::Normal => None,
        }
    }
}

/// Field category used to pick a fuzzy comparison and a reflection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    #[default]
    Default,
    Phone,
    PhonePreference,
    Address,
    Url,
    Currency,
    Markup,
}

/// Re-keys a list of translated objects into a lookup map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForcedMapping {
    /// Field of each object used as the map key.
    pub key: String,
    /// Field projected as the map value; the whole object when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A resolvable field property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Path,
    Type,
    Structure,
    Read,
    Write,
    Sync,
    Reflective,
    Delta,
    Static,
    Important,
    Default,
    Comparison,
    ForceMapping,
    Options,
    Modtime,
    Textual,
}

impl Property {
    pub const ALL: [Property; 16] = [
        Property::Path,
        Property::Type,
        Property::Structure,
        Property::Read,
        Property::Write,
        Property::Sync,
        Property::Reflective,
        Property::Delta,
        Property::Static,
        Property::Important,
        Property::Default,
        Property::Comparison,
        Property::ForceMapping,
        Property::Options,
        Property::Modtime,
        Property::Textual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Property::Path => "path",
            Property::Type => "type",
            Property::Structure => "structure",
            Property::Read => "read",
            Property::Write => "write",
            Property::Sync => "sync",
            Property::Reflective => "reflective",
            Property::Delta => "delta",
            Property::Static => "static",
            Property::Important => "important",
            Property::Default => "default",
            Property::Comparison => "comparison",
            Property::ForceMapping => "force_mapping",
            Property::Options => "options",
            Property::Modtime => "modtime",
            Property::Textual => "textual",
        }
    }

    /// The value a property takes when nothing declares it.
    pub fn fallback(self) -> Value {
        match self {
            Property::Read | Property::Write => Value::Bool(true),
            Property::Reflective
            | Property::Delta
            | Property::Static
            | Property::Important
            | Property::Textual => Value::Bool(false),
            Property::Comparison => to_json(&ComparisonKind::Default),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown property: {s}"))
    }
}

/// Deserializes a present-but-null value as `Some(None)`.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// One layer of property declarations: either a field's global values or
/// its override for a single target. Unset properties defer to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldProperties {
    /// `Some(None)` removes the field from the target.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub path: Option<Option<String>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<TypeTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflective: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<bool>,
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub important: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_mapping: Option<ForcedMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modtime: Option<String>,
    /// Scalars are written back as text, as in CSV cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textual: Option<bool>,
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl FieldProperties {
    /// The layer's declaration of a property, if it makes one.
    ///
    /// An explicit `path: null` is a declaration (of absence) and yields
    /// `Some(Value::Null)`.
    pub fn get(&self, property: Property) -> Option<Value> {
        match property {
            Property::Path => self
                .path
                .as_ref()
                .map(|p| p.as_ref().map_or(Value::Null, |s| Value::String(s.clone()))),
            Property::Type => self.type_tag.as_ref().map(to_json),
            Property::Structure => self.structure.as_ref().map(to_json),
            Property::Read => self.read.map(Value::Bool),
            Property::Write => self.write.map(Value::Bool),
            Property::Sync => self.sync.as_ref().map(to_json),
            Property::Reflective => self.reflective.map(Value::Bool),
            Property::Delta => self.delta.map(Value::Bool),
            Property::Static => self.static_.map(Value::Bool),
            Property::Important => self.important.map(Value::Bool),
            Property::Default => self.default.clone(),
            Property::Comparison => self.comparison.as_ref().map(to_json),
            Property::ForceMapping => self.force_mapping.as_ref().map(to_json),
            Property::Options => self.options.as_ref().map(to_json),
            Property::Modtime => self.modtime.clone().map(Value::String),
            Property::Textual => self.textual.map(Value::Bool),
        }
    }
}
