//! Alias dependency graph.
//!
//! A handle's aliases are derived views of it (e.g. the individual address
//! lines of an address object). Parents are resolved before their aliases so
//! that an applied parent settles its aliases in the same pass. The order is
//! computed once per registry with Kahn's algorithm, breaking ties by
//! declaration order so it is deterministic.

use crate::error::{ConfigError, ConfigResult};
use crate::field::FieldMeta;
use std::collections::{BTreeSet, HashMap};

/// Returns field indices with every parent ahead of its aliases.
pub(crate) fn dependency_order(
    registry: &str,
    fields: &[(String, FieldMeta)],
    index: &HashMap<String, usize>,
) -> ConfigResult<Vec<usize>> {
    let mut in_degree = vec![0usize; fields.len()];
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); fields.len()];

    for (parent, (handle, meta)) in fields.iter().enumerate() {
        for alias in &meta.aliases {
            let child = *index.get(alias).ok_or_else(|| ConfigError::UnknownHandle {
                registry: registry.to_string(),
                handle: alias.clone(),
            })?;
            if child == parent {
                return Err(ConfigError::AliasCycle {
                    registry: registry.to_string(),
                    handles: vec![handle.clone()],
                });
            }
            edges[parent].push(child);
            in_degree[child] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..fields.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut order = Vec::with_capacity(fields.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &edges[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() < fields.len() {
        let handles = (0..fields.len())
            .filter(|i| in_degree[*i] > 0)
            .map(|i| fields[i].0.clone())
            .collect();
        return Err(ConfigError::AliasCycle {
            registry: registry.to_string(),
            handles,
        });
    }
    Ok(order)
}
