//! Per-handle metadata: global properties plus per-target overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::property::{FieldProperties, Property};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// Metadata for one handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMeta {
    /// Properties that apply unless a target overrides them.
    pub global: FieldProperties,
    /// Overrides keyed by target name.
    pub targets: HashMap<String, FieldProperties>,
    /// Name of the registry describing this handle's sub-entities.
    pub sub_data: Option<String>,
    /// Handles whose values are derived from this one.
    pub aliases: Vec<String>,
}

impl FieldMeta {
    /// Parses a handle declaration.
    ///
    /// Besides the global properties the object may carry `targets`,
    /// `sub_data` and `aliases`. Unknown keys are rejected.
    pub fn from_value(handle: &str, value: &Value) -> ConfigResult<Self> {
        let mut object = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map.clone(),
            other => {
                return Err(invalid(handle, "*", format!("expected an object, found {other}")));
            }
        };

        let targets = match object.remove("targets") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(overrides)) => {
                let mut parsed = HashMap::with_capacity(overrides.len());
                for (target, props) in overrides {
                    let props = match props {
                        Value::Object(map) => map,
                        Value::Null => Map::new(),
                        other => {
                            return Err(invalid(
                                handle,
                                "targets",
                                format!("override for {target} must be an object, found {other}"),
                            ));
                        }
                    };
                    parsed.insert(target, parse_properties(handle, props)?);
                }
                parsed
            }
            Some(other) => {
                return Err(invalid(handle, "targets", format!("expected an object, found {other}")));
            }
        };

        let sub_data = match object.remove("sub_data") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name),
            Some(other) => {
                return Err(invalid(handle, "sub_data", format!("expected a name, found {other}")));
            }
        };

        let aliases = match object.remove("aliases") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| invalid(handle, "aliases", e.to_string()))?,
        };

        Ok(Self {
            global: parse_properties(handle, object)?,
            targets,
            sub_data,
            aliases,
        })
    }

    /// Property layers for a resolution chain, most specific first.
    pub fn layers<'a>(
        &'a self,
        chain: &'a [String],
    ) -> impl Iterator<Item = &'a FieldProperties> + 'a {
        chain
            .iter()
            .filter_map(|target| self.targets.get(target))
            .chain(std::iter::once(&self.global))
    }
}

fn parse_properties(handle: &str, props: Map<String, Value>) -> ConfigResult<FieldProperties> {
    for (key, value) in &props {
        Property::from_str(key).map_err(|reason| invalid(handle, key, reason))?;
        let mut single = Map::new();
        single.insert(key.clone(), value.clone());
        serde_json::from_value::<FieldProperties>(Value::Object(single))
            .map_err(|e| invalid(handle, key, e.to_string()))?;
    }
    serde_json::from_value(Value::Object(props)).map_err(|e| invalid(handle, "*", e.to_string()))
}

fn invalid(handle: &str, property: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidProperty {
        handle: handle.to_string(),
        property: property.to_string(),
        reason: reason.into(),
    }
}
