//! Alignment model: cells, entities and transformation parameters
//!
//! An alignment is the input of the mapping generator: an unordered set of
//! transformation rules ("cells") mapping source entities to target
//! entities. Type cells map whole types; property cells are scoped to a
//! single type cell and map one target property.
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use super::Name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known transformation identifiers.
pub mod functions {
    /// Plain type retype: one source type to one target type.
    pub const RETYPE: &str = "retype";
    /// Structural merge: several source types into one target type.
    pub const MERGE: &str = "merge";
    /// Relational join producing a nested (chained) mapping.
    pub const JOIN: &str = "join";
    /// Property rename (path or column reference).
    pub const RENAME: &str = "rename";
    /// Constant assignment to a target property.
    pub const ASSIGN: &str = "assign";
    /// Pattern-based string concatenation.
    pub const FORMATTED_STRING: &str = "formatted-string";
    /// Document-store collection link (nested collection join).
    pub const COLLECTION_LINK: &str = "collection-link";

    /// Transformations whose output may feed an `xlink:href` client
    /// property.
    pub fn is_href_compatible(identifier: &str) -> bool {
        identifier == RENAME || identifier == FORMATTED_STRING
    }
}

/// The alignment: an unordered collection of cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alignment {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl Alignment {
    /// All cells, in input order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The type cells, in input order.
    pub fn type_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_type_cell())
    }

    /// The property cells scoped to the given type cell, in input order.
    pub fn property_cells<'a>(&'a self, type_cell: &'a Cell) -> impl Iterator<Item = &'a Cell> {
        self.cells
            .iter()
            .filter(move |c| c.parent.as_deref() == Some(type_cell.id.as_str()))
    }
}

/// One transformation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Stable cell identifier, unique within the alignment.
    pub id: String,
    /// Transformation identifier, see [`functions`].
    pub transformation: String,
    #[serde(default)]
    pub source: Vec<Entity>,
    #[serde(default)]
    pub target: Vec<Entity>,
    /// Named transformation parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, Vec<ParameterValue>>,
    /// Owning type cell id; `None` for type cells.
    #[serde(default)]
    pub parent: Option<String>,
}

impl Cell {
    pub fn is_type_cell(&self) -> bool {
        self.parent.is_none()
    }

    pub fn first_source(&self) -> Option<&Entity> {
        self.source.first()
    }

    pub fn first_target(&self) -> Option<&Entity> {
        self.target.first()
    }

    /// First value of a named parameter, if present.
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name).and_then(|values| values.first())
    }
}

/// A source or target entity reference.
///
/// Type entities carry an empty `path`; property entities carry the ordered
/// path of child steps from the owning type down to the leaf property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// The owning (or referenced) type.
    pub type_name: Name,
    #[serde(default)]
    pub path: Vec<ChildStep>,
}

impl Entity {
    pub fn type_ref(type_name: Name) -> Self {
        Self {
            type_name,
            path: Vec::new(),
        }
    }

    pub fn property_ref(type_name: Name, path: Vec<ChildStep>) -> Self {
        Self { type_name, path }
    }

    pub fn is_type(&self) -> bool {
        self.path.is_empty()
    }

    pub fn last_step(&self) -> Option<&ChildStep> {
        self.path.last()
    }
}

/// One step in a property path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildStep {
    pub name: Name,
    /// Repetition index, set when the property is part of a repeated group.
    #[serde(default)]
    pub context_id: Option<u32>,
    /// Optional filter condition attached to this step.
    #[serde(default)]
    pub condition: Option<String>,
}

impl ChildStep {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            context_id: None,
            condition: None,
        }
    }

    pub fn with_context(name: Name, context_id: u32) -> Self {
        Self {
            name,
            context_id: Some(context_id),
            condition: None,
        }
    }
}

/// A transformation parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Flag(bool),
    Text(String),
    Join(JoinParameter),
}

impl ParameterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_join(&self) -> Option<&JoinParameter> {
        match self {
            ParameterValue::Join(join) => Some(join),
            _ => None,
        }
    }
}

/// Parameter payload of a join type cell: the ordered join types and the
/// join conditions between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinParameter {
    pub types: Vec<Name>,
    #[serde(default)]
    pub conditions: Vec<JoinCondition>,
}

/// One join condition: base (container-side) and join (nested-side)
/// property references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCondition {
    pub base: Entity,
    pub join: Entity,
}

impl JoinCondition {
    /// Local name of the container-side join column.
    pub fn base_column(&self) -> Option<&str> {
        self.base.last_step().map(|s| s.name.local.as_str())
    }

    /// Local name of the nested-side join column.
    pub fn join_column(&self) -> Option<&str> {
        self.join.last_step().map(|s| s.name.local.as_str())
    }
}
