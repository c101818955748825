//! Input data model: alignments, schemas, chaining and run configuration
//!
//! Everything in this module is read-only from the engine's perspective.
//! Values are deserialized once from their JSON representations and never
//! mutated during a generation (the feature-chaining configuration is the
//! one exception: the engine works on its own copy).
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

pub mod alignment;
pub mod chaining;
pub mod config;
pub mod schema;

pub use alignment::{
    functions, Alignment, Cell, ChildStep, Entity, JoinCondition, JoinParameter, ParameterValue,
};
pub use chaining::{find_longest_nested_path, ChainConfiguration, FeatureChaining};
pub use config::{DataStoreConfig, WorkspaceConfiguration, WorkspaceSettings};
pub use schema::{
    Cardinality, PathKind, PathTag, PropertyDefinition, ResolvedStep, Schema, SchemaSpace,
    TypeDefinition, TypeKind,
};

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A qualified name: namespace URI, local name and an optional preferred
/// prefix.
///
/// Two names denote the same schema component when namespace and local name
/// agree; the prefix is a serialization hint only. Use [`Name::matches`] for
/// semantic comparison (the derived `PartialEq` also compares prefixes and is
/// meant for exact value equality in tests).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    #[serde(default)]
    pub namespace: String,
    pub local: String,
    #[serde(default)]
    pub prefix: String,
}

impl Name {
    /// Create a name in a namespace, without a preferred prefix.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
            prefix: String::new(),
        }
    }

    /// Create a name with a preferred prefix.
    pub fn with_prefix(
        namespace: impl Into<String>,
        local: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
            prefix: prefix.into(),
        }
    }

    /// Create a name with no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new("", local)
    }

    /// Semantic equality: namespace URI plus local name; prefixes are
    /// ignored.
    pub fn matches(&self, other: &Name) -> bool {
        self.namespace == other.namespace && self.local == other.local
    }

    /// Stable string form usable as a cache key: `{namespace}local`.
    pub fn key(&self) -> String {
        if self.namespace.is_empty() {
            self.local.clone()
        } else {
            format!("{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Load any deserializable model value from a JSON file.
pub fn from_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        message: format!("failed to read {}", path.display()),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| Error::Json {
        message: format!("failed to parse {}", path.display()),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matches_ignores_prefix() {
        let a = Name::with_prefix("http://example.com/ex", "Parcel", "ex");
        let b = Name::new("http://example.com/ex", "Parcel");
        assert!(a.matches(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_name_key() {
        assert_eq!(
            Name::new("http://example.com/ex", "Parcel").key(),
            "{http://example.com/ex}Parcel"
        );
        assert_eq!(Name::local("area").key(), "area");
    }
}
