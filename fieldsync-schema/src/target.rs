//! The target inheritance tree.
//!
//! Targets form a forest, e.g. `api → wp-api → wp-api-v2 → wp-api-v2-edit`.
//! A per-target property override declared on `wp-api` applies to every
//! descendant unless a closer ancestor (or the target itself) overrides it.

use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;
use std::collections::HashMap;

/// A forest of uniquely named targets.
#[derive(Debug, Clone, Default)]
pub struct TargetTree {
    /// Declaration order.
    names: Vec<String>,
    /// Direct parent of each target (`None` for roots).
    parents: HashMap<String, Option<String>>,
    /// Each target followed by its ancestors, closest first.
    chains: HashMap<String, Vec<String>>,
}

impl TargetTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a nested JSON mapping.
    ///
    /// ```
    /// use fieldsync_schema::TargetTree;
    /// use serde_json::json;
    ///
    /// let tree = TargetTree::from_value(&json!({
    ///     "api": { "wp-api": { "wp-api-v2": {} } },
    ///     "csv": null,
    /// })).unwrap();
    /// assert_eq!(tree.ancestors("wp-api-v2").unwrap(), ["wp-api", "api"]);
    /// ```
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        let mut tree = Self::new();
        tree.insert_children(value, None)?;
        Ok(tree)
    }

    fn insert_children(&mut self, value: &Value, parent: Option<&str>) -> ConfigResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::Object(children) => {
                for (name, grandchildren) in children {
                    self.insert(name, parent)?;
                    self.insert_children(grandchildren, Some(name))?;
                }
                Ok(())
            }
            other => Err(ConfigError::MalformedTree(format!(
                "expected a mapping of target names under {}, found {other}",
                parent.unwrap_or("the root")
            ))),
        }
    }

    /// Declares a target under an already declared parent.
    pub fn insert(&mut self, name: &str, parent: Option<&str>) -> ConfigResult<()> {
        if name.is_empty() {
            return Err(ConfigError::MalformedTree("empty target name".into()));
        }
        if self.parents.contains_key(name) {
            return Err(ConfigError::DuplicateTarget(name.to_string()));
        }
        let mut chain = vec![name.to_string()];
        if let Some(parent) = parent {
            let parent_chain = self
                .chains
                .get(parent)
                .ok_or_else(|| ConfigError::UnknownTarget(parent.to_string()))?;
            chain.extend(parent_chain.iter().cloned());
        }
        self.names.push(name.to_string());
        self.parents
            .insert(name.to_string(), parent.map(str::to_string));
        self.chains.insert(name.to_string(), chain);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    /// Fails with [`ConfigError::UnknownTarget`] unless the target is declared.
    pub fn validate(&self, name: &str) -> ConfigResult<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownTarget(name.to_string()))
        }
    }

    /// All targets in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn parent(&self, name: &str) -> ConfigResult<Option<&str>> {
        self.parents
            .get(name)
            .map(Option::as_deref)
            .ok_or_else(|| ConfigError::UnknownTarget(name.to_string()))
    }

    /// The target followed by its ancestors, closest first.
    pub fn chain(&self, name: &str) -> ConfigResult<&[String]> {
        self.chains
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigError::UnknownTarget(name.to_string()))
    }

    /// Ancestors of a target, closest first.
    pub fn ancestors(&self, name: &str) -> ConfigResult<&[String]> {
        self.chain(name).map(|chain| &chain[1..])
    }

    /// Returns true if `name` is `ancestor` or lies beneath it.
    pub fn is_descendant_of(&self, name: &str, ancestor: &str) -> ConfigResult<bool> {
        self.validate(ancestor)?;
        Ok(self.chain(name)?.iter().any(|t| t == ancestor))
    }

    /// Root targets in declaration order.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .filter(|name| matches!(self.parents.get(name.as_str()), Some(None)))
            .map(String::as_str)
    }
}
