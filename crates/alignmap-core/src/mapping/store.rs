//! Mapping store: the output-model builder
//!
//! Content-addressed get-or-create for feature-type and attribute mappings,
//! the synthetic join-link counter, and the main/included-file partitioning
//! algorithm. The store is exclusively owned by one generator for the
//! duration of one generation run; documents handed out are deep copies of
//! its state.
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use super::document::{
    AttributeMapping, DataStore, FeatureTypeMapping, MappingDocument, Parameter,
    INCLUDED_TYPES_FILE,
};
use super::document::FEATURE_LINK_FIELD;
use super::namespaces::NamespaceRegistry;
use crate::model::{DataStoreConfig, ResolvedStep, TypeDefinition};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Stable handle to a feature-type mapping in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureTypeHandle(usize);

/// Stable handle to an attribute mapping in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeHandle {
    feature: usize,
    attribute: usize,
}

/// Builder for the mapping configuration under construction.
#[derive(Debug, Default)]
pub struct MappingStore {
    namespaces: NamespaceRegistry,
    datastores: Vec<DataStore>,
    schema_uris: Vec<String>,
    includes: Vec<String>,
    catalog: Option<String>,
    type_mappings: Vec<FeatureTypeMapping>,
    type_index: HashMap<String, usize>,
    /// Mappings of proper feature types, grouped by target element.
    feature_elements: HashMap<String, Vec<usize>>,
    /// Mappings of non-feature types and secondary mappings, grouped by
    /// target element.
    non_feature_elements: HashMap<String, Vec<usize>>,
    attribute_index: HashMap<String, (usize, usize)>,
    link_counters: HashMap<String, u32>,
    /// Document-store collection name prefixed to every mapping name.
    mapping_prefix: Option<String>,
    /// Allow attribute mappings without a discriminating path (falls back
    /// to a random unique key).
    permissive_attribute_keys: bool,
}

impl MappingStore {
    pub fn new(permissive_attribute_keys: bool) -> Self {
        Self {
            namespaces: NamespaceRegistry::new(),
            permissive_attribute_keys,
            ..Default::default()
        }
    }

    /// Seed a fresh store from a base document template. Datastores, target
    /// schema URIs, includes and the catalog reference are carried over;
    /// template namespaces are discarded and re-collected from the
    /// alignment.
    pub fn from_template(template: &MappingDocument, permissive_attribute_keys: bool) -> Self {
        let mut store = Self::new(permissive_attribute_keys);
        store.datastores = template.source_data_stores.clone();
        store.schema_uris = template.schema_uris.clone();
        store.includes = template.includes.clone();
        store.catalog = template.catalog.clone();
        store
    }

    pub fn set_mapping_prefix(&mut self, prefix: impl Into<String>) {
        self.mapping_prefix = Some(prefix.into());
    }

    pub fn mapping_prefix(&self) -> Option<&str> {
        self.mapping_prefix.as_deref()
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    pub fn namespaces_mut(&mut self) -> &mut NamespaceRegistry {
        &mut self.namespaces
    }

    /// The datastore new feature-type mappings read from, created on
    /// demand.
    pub fn default_datastore_id(&mut self) -> String {
        if self.datastores.is_empty() {
            self.datastores.push(DataStore {
                id: Uuid::new_v4().to_string(),
                id_attribute: None,
                parameters: Vec::new(),
            });
        }
        self.datastores[0].id.clone()
    }

    /// Merge a datastore configuration into the default datastore:
    /// parameters update existing entries by name and append new ones.
    pub fn merge_datastore_config(&mut self, config: &DataStoreConfig) {
        if self.datastores.is_empty() {
            self.datastores.push(DataStore {
                id: config
                    .id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                id_attribute: None,
                parameters: Vec::new(),
            });
        }
        let target = &mut self.datastores[0];
        for (name, value) in &config.parameters {
            match target.parameters.iter_mut().find(|p| &p.name == name) {
                Some(parameter) => parameter.value = value.clone(),
                None => target.parameters.push(Parameter {
                    name: name.clone(),
                    value: value.clone(),
                }),
            }
        }
    }

    pub fn add_schema_uri(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        if !uri.is_empty() {
            self.schema_uris.push(uri);
        }
    }

    pub fn update_schema_uri(&mut self, old_uri: &str, new_uri: &str) {
        if old_uri.is_empty() || new_uri.is_empty() {
            return;
        }
        if let Some(position) = self.schema_uris.iter().position(|u| u == old_uri) {
            self.schema_uris.remove(position);
            self.schema_uris.push(new_uri.to_string());
        }
    }

    pub fn feature_type(&self, handle: FeatureTypeHandle) -> &FeatureTypeMapping {
        &self.type_mappings[handle.0]
    }

    pub fn feature_type_mut(&mut self, handle: FeatureTypeHandle) -> &mut FeatureTypeMapping {
        &mut self.type_mappings[handle.0]
    }

    pub fn attribute(&self, handle: AttributeHandle) -> &AttributeMapping {
        &self.type_mappings[handle.feature].attribute_mappings[handle.attribute]
    }

    pub fn attribute_mut(&mut self, handle: AttributeHandle) -> &mut AttributeMapping {
        &mut self.type_mappings[handle.feature].attribute_mappings[handle.attribute]
    }

    pub fn attribute_owner(&self, handle: AttributeHandle) -> FeatureTypeHandle {
        FeatureTypeHandle(handle.feature)
    }

    pub fn type_mappings(&self) -> &[FeatureTypeMapping] {
        &self.type_mappings
    }

    /// Append an attribute mapping outside the content-addressed index.
    /// Used for synthetic records (join-link counterparts) that must never
    /// coalesce with alignment-driven mappings.
    pub fn push_attribute(
        &mut self,
        owner: FeatureTypeHandle,
        attribute: AttributeMapping,
    ) -> AttributeHandle {
        let mappings = &mut self.type_mappings[owner.0].attribute_mappings;
        mappings.push(attribute);
        AttributeHandle {
            feature: owner.0,
            attribute: mappings.len() - 1,
        }
    }

    fn effective_mapping_name(
        &self,
        target_type: &TypeDefinition,
        mapping_name: Option<&str>,
    ) -> Option<String> {
        if let Some(prefix) = &self.mapping_prefix {
            return Some(format!("{}-{}", prefix, target_type.element_name()));
        }
        mapping_name
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    fn feature_type_key(target_type: &TypeDefinition, mapping_name: Option<&str>) -> String {
        match mapping_name {
            Some(name) if !name.is_empty() => format!("{}__{}", target_type.name.key(), name),
            _ => target_type.name.key(),
        }
    }

    /// Get or create the feature-type mapping for a target type. Repeated
    /// lookups with an equal `(type, mapping name)` key return the same
    /// record. `secondary` mappings (join-nested) are kept out of the
    /// top-level partition regardless of the target's classification.
    pub fn get_or_create_feature_type_mapping(
        &mut self,
        target_type: &TypeDefinition,
        mapping_name: Option<&str>,
        secondary: bool,
    ) -> FeatureTypeHandle {
        let mapping_name = self.effective_mapping_name(target_type, mapping_name);
        let key = Self::feature_type_key(target_type, mapping_name.as_deref());
        if let Some(&index) = self.type_index.get(&key) {
            return FeatureTypeHandle(index);
        }

        let source_data_store = self.default_datastore_id();
        // if a namespace with the same URI already exists with a valid
        // prefix, that one wins over the prefix carried by the type name
        let target_element = match self.namespaces.prefix_for(&target_type.name) {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}:{}", prefix, target_type.element_name())
            }
            _ => target_type.element_name().to_string(),
        };

        let index = self.type_mappings.len();
        self.type_mappings.push(FeatureTypeMapping {
            source_data_store: Some(source_data_store),
            target_element: target_element.clone(),
            mapping_name,
            ..Default::default()
        });
        self.type_index.insert(key, index);

        let partition = if target_type.is_feature() && !secondary {
            &mut self.feature_elements
        } else {
            &mut self.non_feature_elements
        };
        partition.entry(target_element).or_default().push(index);

        FeatureTypeHandle(index)
    }

    fn attribute_key(
        &self,
        owning_type: &TypeDefinition,
        path: &[ResolvedStep],
    ) -> Option<String> {
        let mut key = format!("{}__", owning_type.name.key());
        if path.is_empty() {
            if !self.permissive_attribute_keys {
                return None;
            }
            // no discriminating path: fall back to a random unique key so a
            // fresh record is created
            key.push_str(&Uuid::new_v4().to_string());
        } else {
            for step in path {
                key.push_str(&step.property.name.key());
                if let Some(context_id) = step.context_id {
                    key.push_str(&context_id.to_string());
                }
                key.push_str("__");
            }
        }
        Some(key)
    }

    /// Get or create the attribute mapping identified by the owning type
    /// and the normalized property path. Returns `None` for an empty path
    /// unless the store allows permissive keys.
    pub fn get_or_create_attribute_mapping(
        &mut self,
        owning_type: &TypeDefinition,
        mapping_name: Option<&str>,
        path: &[ResolvedStep],
    ) -> Option<AttributeHandle> {
        let key = self.attribute_key(owning_type, path)?;
        if let Some(&(feature, attribute)) = self.attribute_index.get(&key) {
            return Some(AttributeHandle { feature, attribute });
        }

        let owner = self.get_or_create_feature_type_mapping(owning_type, mapping_name, false);
        let mappings = &mut self.type_mappings[owner.0].attribute_mappings;
        let attribute = mappings.len();
        mappings.push(AttributeMapping::default());
        self.attribute_index.insert(key, (owner.0, attribute));

        Some(AttributeHandle {
            feature: owner.0,
            attribute,
        })
    }

    /// Next synthetic join-link column for a feature type:
    /// `FEATURE_LINK[1]`, `FEATURE_LINK[2]`, ... per `(type, mapping name)`.
    pub fn unique_feature_link_attribute(
        &mut self,
        feature_type: &TypeDefinition,
        mapping_name: Option<&str>,
    ) -> String {
        let mapping_name = self.effective_mapping_name(feature_type, mapping_name);
        let key = Self::feature_type_key(feature_type, mapping_name.as_deref());
        let counter = self.link_counters.entry(key).or_insert(0);
        *counter += 1;
        format!("{}[{}]", FEATURE_LINK_FIELD, counter)
    }

    /// Whether the output must be split into a main document and an
    /// included-types document: true iff any non-feature-type mapping
    /// exists, or some target element carries more than one mapping.
    pub fn requires_multiple_files(&self) -> bool {
        !self.non_feature_elements.is_empty()
            || self.feature_elements.values().any(|m| m.len() > 1)
    }

    /// Partition mapping indices into (main, included).
    fn partition(&self) -> (BTreeSet<usize>, BTreeSet<usize>) {
        let mut main = BTreeSet::new();
        let mut included = BTreeSet::new();

        for indices in self.feature_elements.values() {
            if indices.len() > 1 {
                // prefer the mapping without a mapping name as the top-level
                // representative; there is no guarantee this is the right
                // one to pick, the tie-break is arbitrary by contract
                let top = indices
                    .iter()
                    .copied()
                    .find(|&i| self.type_mappings[i].mapping_name.is_none())
                    .unwrap_or(indices[0]);
                main.insert(top);
                included.extend(indices.iter().copied().filter(|&i| i != top));
            } else if let Some(&only) = indices.first() {
                main.insert(only);
            }
        }

        for indices in self.non_feature_elements.values() {
            included.extend(indices.iter().copied());
        }

        (main, included)
    }

    fn snapshot(&self) -> MappingDocument {
        MappingDocument {
            namespaces: self.namespaces.namespaces().to_vec(),
            includes: self.includes.clone(),
            source_data_stores: self.datastores.clone(),
            schema_uris: self.schema_uris.clone(),
            type_mappings: self.type_mappings.clone(),
            catalog: self.catalog.clone(),
        }
    }

    fn restrict(&self, document: &mut MappingDocument, keep: &BTreeSet<usize>) {
        document.type_mappings = keep
            .iter()
            .map(|&index| self.type_mappings[index].clone())
            .collect();
        let used: BTreeSet<&str> = document
            .type_mappings
            .iter()
            .filter_map(|m| m.source_data_store.as_deref())
            .collect();
        document
            .source_data_stores
            .retain(|ds| used.contains(ds.id.as_str()));
    }

    /// The main output document. When splitting is required it references
    /// the included-types document and keeps only the top-level mappings
    /// (and the datastores they use).
    pub fn main_mapping(&self) -> MappingDocument {
        let mut document = self.snapshot();
        if self.requires_multiple_files() {
            document.includes.push(INCLUDED_TYPES_FILE.to_string());
            let (main, _) = self.partition();
            self.restrict(&mut document, &main);
        }
        document
    }

    /// The included-types document, or `None` when a single file suffices.
    pub fn included_types_mapping(&self) -> Option<MappingDocument> {
        if !self.requires_multiple_files() {
            return None;
        }
        let mut document = self.snapshot();
        let (_, included) = self.partition();
        self.restrict(&mut document, &included);
        Some(document)
    }
}
