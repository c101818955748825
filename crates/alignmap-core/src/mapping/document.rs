//! Output mapping document model
//!
//! The tree handed to downstream consumers: namespaces, source datastores,
//! target schema references and the feature-type mapping records. Documents
//! returned to callers are deep copies of the builder's internal state and
//! are frozen by convention once emitted.
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};

/// Namespace of the mapping configuration elements.
pub const MAPPING_NAMESPACE: &str = "http://www.geotools.org/app-schema";
/// Prefix used for the mapping configuration namespace.
pub const MAPPING_PREFIX: &str = "as";
/// File name of the included-types mapping document, referenced from the
/// main document when the output is split.
pub const INCLUDED_TYPES_FILE: &str = "includedTypes.xml";
/// Base name of synthetic join-link columns.
pub const FEATURE_LINK_FIELD: &str = "FEATURE_LINK";

/// XML Schema instance namespace (for `xsi:nil` client properties).
pub const XSI_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Conventional prefix of [`XSI_URI`].
pub const XSI_PREFIX: &str = "xsi";
/// Local name of the nil attribute.
pub const XSI_NIL_LOCAL: &str = "nil";
/// XLink namespace (for `xlink:href` client properties).
pub const XLINK_URI: &str = "http://www.w3.org/1999/xlink";

/// A complete mapping configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    /// Referenced secondary mapping files.
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub source_data_stores: Vec<DataStore>,
    /// Target schema URIs.
    #[serde(default)]
    pub schema_uris: Vec<String>,
    #[serde(default)]
    pub type_mappings: Vec<FeatureTypeMapping>,
    #[serde(default)]
    pub catalog: Option<String>,
}

/// A `(uri, prefix)` pair. The uri is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

/// A source datastore descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStore {
    pub id: String,
    #[serde(default)]
    pub id_attribute: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// A named datastore connection parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// Output record binding one target element to one source type plus its
/// attribute mappings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTypeMapping {
    #[serde(default)]
    pub source_data_store: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    /// `{prefix}:{element name}` of the target element.
    pub target_element: String,
    /// Distinguishes multiple mappings of the same target element.
    #[serde(default)]
    pub mapping_name: Option<String>,
    #[serde(default)]
    pub denormalised: bool,
    #[serde(default)]
    pub xml_datastore: bool,
    #[serde(default)]
    pub item_xpath: Option<String>,
    #[serde(default)]
    pub attribute_mappings: Vec<AttributeMapping>,
}

impl FeatureTypeMapping {
    /// The value a link expression uses to address this mapping: the quoted
    /// mapping name when one is set, else the target element.
    pub fn link_label(&self) -> String {
        match self.mapping_name.as_deref() {
            // always enclose mapping names in single quotes
            Some(name) if !name.is_empty() => format!("'{}'", name),
            _ => self.target_element.clone(),
        }
    }
}

/// Output record binding one target attribute path to a source expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeMapping {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parent_label: Option<String>,
    #[serde(default)]
    pub target_attribute: Option<String>,
    /// Concrete type instantiated at the target node (e.g. a geometry
    /// type).
    #[serde(default)]
    pub target_attribute_node: Option<String>,
    #[serde(default)]
    pub id_expression: Option<AttributeExpression>,
    #[serde(default)]
    pub source_expression: Option<AttributeExpression>,
    #[serde(default)]
    pub is_multiple: bool,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub encode_if_empty: bool,
    #[serde(default)]
    pub instance_path: Option<String>,
    #[serde(default)]
    pub client_properties: Vec<ClientProperty>,
    #[serde(default)]
    pub anonymous_attributes: Vec<AnonymousAttribute>,
    #[serde(default)]
    pub multi_value_join: Option<MultiValueJoin>,
}

impl AttributeMapping {
    pub fn has_client_property(&self, name: &str) -> bool {
        self.client_property(name).is_some()
    }

    pub fn client_property(&self, name: &str) -> Option<&ClientProperty> {
        self.client_properties.iter().find(|p| p.name == name)
    }

    pub fn client_property_mut(&mut self, name: &str) -> Option<&mut ClientProperty> {
        self.client_properties.iter_mut().find(|p| p.name == name)
    }

    pub fn has_anonymous_attribute(&self, name: &str) -> bool {
        self.anonymous_attributes.iter().any(|a| a.name == name)
    }
}

/// A name/value pair representing an XML attribute (or a synthetic marker
/// such as `xsi:nil`) attached to an attribute mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProperty {
    pub name: String,
    pub value: String,
}

/// A synthesized attribute of an anonymous multi-value sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousAttribute {
    pub name: String,
    pub value: String,
}

/// Multi-valued join descriptor: how one source row expands into many
/// target values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiValueJoin {
    pub target_table: String,
    pub source_column: String,
    pub target_column: String,
    #[serde(default)]
    pub target_value: Option<String>,
}

/// A source or id expression of an attribute mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeExpression {
    #[serde(default)]
    pub ocql: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub input_attribute: Option<String>,
    /// Nested mapping addressed by a join link.
    #[serde(default)]
    pub link_element: Option<String>,
    /// Synthetic link column pairing container and nested mappings.
    #[serde(default)]
    pub link_field: Option<String>,
}

impl AttributeExpression {
    pub fn ocql(expression: impl Into<String>) -> Self {
        Self {
            ocql: Some(expression.into()),
            ..Default::default()
        }
    }
}
