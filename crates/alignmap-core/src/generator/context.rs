//! Mapping context shared by all handlers during one generation run
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::mapping::MappingStore;
use crate::model::{
    Alignment, ChainConfiguration, Entity, FeatureChaining, Name, ResolvedStep, SchemaSpace,
    TypeDefinition, WorkspaceConfiguration,
};
use serde::{Deserialize, Serialize};

/// Source dialect of a generation run.
///
/// Picks the handler policies that differ between relational and
/// document-store sources: attribute-key strictness, anonymous-sequence and
/// repeated-element classification, and mapping-name prefixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    #[default]
    Relational,
    DocumentStore,
}

impl Dialect {
    /// Document-store sources legitimately map many attributes that share
    /// no discriminating path; the store falls back to random keys for
    /// them.
    pub fn permissive_attribute_keys(self) -> bool {
        matches!(self, Dialect::DocumentStore)
    }

    /// Anonymous multi-value sequences are only classified for relational
    /// sources.
    pub fn anonymous_sequences_enabled(self) -> bool {
        matches!(self, Dialect::Relational)
    }

    /// Repeated ("sequence") elements under a join are only classified for
    /// relational sources.
    pub fn sequence_elements_enabled(self) -> bool {
        matches!(self, Dialect::Relational)
    }
}

/// State shared by the orchestrator and the transformation handlers for the
/// duration of one `generate()` call. Owns the store exclusively; nothing
/// else may mutate it concurrently.
pub struct MappingContext<'a> {
    pub store: MappingStore,
    pub alignment: &'a Alignment,
    pub target_space: &'a SchemaSpace,
    pub source_space: Option<&'a SchemaSpace>,
    /// Target types relevant to mapping, used by the join fallback
    /// heuristic.
    pub relevant_types: Vec<&'a TypeDefinition>,
    /// Working copy of the feature chaining configuration; collection-link
    /// handlers register chains here as they discover them.
    pub chaining: Option<FeatureChaining>,
    pub workspaces: Option<&'a WorkspaceConfiguration>,
    pub dialect: Dialect,
}

impl<'a> MappingContext<'a> {
    pub fn new(
        store: MappingStore,
        alignment: &'a Alignment,
        target_space: &'a SchemaSpace,
        source_space: Option<&'a SchemaSpace>,
        chaining: Option<FeatureChaining>,
        workspaces: Option<&'a WorkspaceConfiguration>,
        dialect: Dialect,
    ) -> Self {
        Self {
            store,
            alignment,
            target_space,
            source_space,
            relevant_types: target_space.mapping_relevant_types().collect(),
            chaining,
            workspaces,
            dialect,
        }
    }

    /// Register a namespace (and its preferred prefix) with the store.
    pub fn get_or_create_namespace(&mut self, uri: &str, prefix: &str) {
        self.store.namespaces_mut().get_or_create(uri, prefix);
    }

    /// Resolve a target type by qualified name.
    pub fn type_definition(&self, name: &Name) -> Result<&'a TypeDefinition> {
        self.target_space
            .type_by_name(name)
            .ok_or_else(|| Error::SchemaLookup {
                message: format!("unknown target type '{}'", name),
            })
    }

    /// Resolve a source type by qualified name, when a source schema is
    /// available.
    pub fn source_type(&self, name: &Name) -> Option<&'a TypeDefinition> {
        self.source_space.and_then(|space| space.type_by_name(name))
    }

    /// Resolve a target property entity into its owning type definition and
    /// resolved path.
    pub fn resolve_target_entity(
        &self,
        entity: &Entity,
    ) -> Result<(&'a TypeDefinition, Vec<ResolvedStep>)> {
        let owning_type = self.type_definition(&entity.type_name)?;
        let path = self.target_space.resolve_path(owning_type, &entity.path)?;
        Ok((owning_type, path))
    }

    /// The type a chain configuration nests into: its explicit
    /// reference-linked type when set, else the type of the nested target
    /// property.
    pub fn chain_nested_type(&self, chain: &ChainConfiguration) -> Result<&'a TypeDefinition> {
        if let Some(linked) = &chain.reference_linked_type {
            return self.type_definition(linked);
        }

        let (owning_type, path) = self.resolve_target_entity(&chain.nested_target)?;
        let leaf = path.last().ok_or_else(|| Error::SchemaLookup {
            message: format!(
                "chain for '{}' has an empty nested target path",
                owning_type.name
            ),
        })?;
        let type_name = leaf
            .property
            .type_name
            .as_ref()
            .ok_or_else(|| Error::SchemaLookup {
                message: format!(
                    "nested target property '{}' has no complex type",
                    leaf.property.name
                ),
            })?;
        self.type_definition(type_name)
    }

    /// Unwrap object-property encoding: a reference type whose single
    /// feature-typed child is the actual payload resolves to that child's
    /// type.
    pub fn xml_property_type(&self, definition: &'a TypeDefinition) -> &'a TypeDefinition {
        if !definition.is_reference() {
            return definition;
        }
        let mut linked = definition
            .children
            .iter()
            .filter_map(|child| child.type_name.as_ref())
            .filter_map(|name| self.target_space.type_by_name(name))
            .filter(|t| t.is_feature());
        match (linked.next(), linked.next()) {
            (Some(only), None) => only,
            _ => definition,
        }
    }

    /// Relative document path of a source property: its own path tag minus
    /// the owning type's path prefix. `None` when either tag is missing.
    pub fn relative_document_path(&self, entity: &Entity) -> Option<String> {
        let space = self.source_space?;
        let owning_type = space.type_by_name(&entity.type_name)?;
        let path = space.resolve_path(owning_type, &entity.path).ok()?;
        let property_tag = path.last()?.property.path_tag.clone()?;

        match owning_type.path_tag.as_ref() {
            Some(type_tag) => {
                let prefix = format!("{}.", type_tag.path);
                Some(
                    property_tag
                        .path
                        .strip_prefix(&prefix)
                        .unwrap_or(&property_tag.path)
                        .to_string(),
                )
            }
            None => Some(property_tag.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChildStep, PathKind, PathTag, PropertyDefinition, Schema, TypeKind,
    };

    fn ex(local: &str) -> Name {
        Name::with_prefix("http://example.com/ex", local, "ex")
    }

    fn source_space() -> SchemaSpace {
        let mut parcel = TypeDefinition::new(Name::local("parcel"), TypeKind::Object);
        parcel.path_tag = Some(PathTag {
            root_key: "parcels".to_string(),
            key: "parcel".to_string(),
            path: "parcels".to_string(),
            kind: PathKind::Collection,
        });
        let mut area = PropertyDefinition::new(Name::local("area"));
        area.path_tag = Some(PathTag {
            root_key: "parcels".to_string(),
            key: "area".to_string(),
            path: "parcels.properties.area".to_string(),
            kind: PathKind::Simple,
        });
        parcel.children.push(area);

        SchemaSpace::new(vec![Schema {
            location: "mongodb://localhost/db".to_string(),
            namespace: String::new(),
            types: vec![parcel],
        }])
    }

    fn target_space() -> SchemaSpace {
        SchemaSpace::new(vec![Schema {
            location: "http://example.com/parcels.xsd".to_string(),
            namespace: "http://example.com/ex".to_string(),
            types: vec![TypeDefinition::new(ex("Parcel"), TypeKind::Feature)],
        }])
    }

    #[test]
    fn test_relative_document_path() {
        let alignment = Alignment::default();
        let source = source_space();
        let target = target_space();
        let context = MappingContext::new(
            MappingStore::new(true),
            &alignment,
            &target,
            Some(&source),
            None,
            None,
            Dialect::DocumentStore,
        );

        let entity = Entity::property_ref(
            Name::local("parcel"),
            vec![ChildStep::new(Name::local("area"))],
        );
        assert_eq!(
            context.relative_document_path(&entity),
            Some("properties.area".to_string())
        );
    }

    #[test]
    fn test_dialect_policies() {
        assert!(Dialect::DocumentStore.permissive_attribute_keys());
        assert!(!Dialect::Relational.permissive_attribute_keys());
        assert!(Dialect::Relational.anonymous_sequences_enabled());
        assert!(!Dialect::DocumentStore.sequence_elements_enabled());
    }
}
