//! Feature chaining configuration
//!
//! Records, for join-based type cells, which nested feature-type mapping a
//! given target entity path resolves to. Consulted for every property cell
//! of a join to decide whether the property belongs to the current nesting
//! level or a deeper one.

use super::alignment::{ChildStep, Entity};
use super::Name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All chain configurations of an alignment, keyed by join identifier
/// (usually the join cell's id).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureChaining {
    #[serde(default)]
    pub joins: BTreeMap<String, Vec<ChainConfiguration>>,
}

impl FeatureChaining {
    /// The chains configured for a join, in configuration order.
    pub fn chains(&self, join_id: &str) -> &[ChainConfiguration] {
        self.joins.get(join_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn put_chain(&mut self, join_id: impl Into<String>, chain: ChainConfiguration) {
        self.joins.entry(join_id.into()).or_default().push(chain);
    }

    pub fn join_ids(&self) -> impl Iterator<Item = &String> {
        self.joins.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }
}

/// One chain: the nested target entity a join step maps into, and the
/// mapping name of the resulting nested feature-type mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfiguration {
    #[serde(default)]
    pub chain_index: usize,
    #[serde(default)]
    pub prev_chain_index: Option<usize>,
    /// Target property entity the nested type is reached through.
    pub nested_target: Entity,
    #[serde(default)]
    pub mapping_name: Option<String>,
    /// When the nested target is a reference type, the concrete type it
    /// links to.
    #[serde(default)]
    pub reference_linked_type: Option<Name>,
}

impl ChainConfiguration {
    pub fn new(nested_target: Entity) -> Self {
        Self {
            chain_index: 0,
            prev_chain_index: None,
            nested_target,
            mapping_name: None,
            reference_linked_type: None,
        }
    }
}

/// Is `nested` a path prefix of `property`? Steps are compared by qualified
/// child name.
pub fn is_nested(nested: &[ChildStep], property: &[ChildStep]) -> bool {
    nested.len() <= property.len()
        && nested
            .iter()
            .zip(property.iter())
            .all(|(n, p)| n.name.matches(&p.name))
}

/// Among `chains`, find the one with the longest nested target path that is
/// a prefix of `target_path`.
pub fn find_longest_nested_path<'a>(
    target_path: &[ChildStep],
    chains: &'a [ChainConfiguration],
) -> Option<&'a ChainConfiguration> {
    if target_path.is_empty() {
        return None;
    }

    let mut best: Option<&ChainConfiguration> = None;
    let mut max_len = 0;
    for chain in chains {
        let nested_path = &chain.nested_target.path;
        if is_nested(nested_path, target_path) && nested_path.len() > max_len {
            max_len = nested_path.len();
            best = Some(chain);
        }
    }

    best
}
