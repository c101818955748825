//! Output model and builder for the mapping configuration
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

pub mod document;
pub mod namespaces;
pub mod path;
pub mod store;

pub use document::{
    AnonymousAttribute, AttributeExpression, AttributeMapping, ClientProperty, DataStore,
    FeatureTypeMapping, MappingDocument, MultiValueJoin, Namespace, Parameter,
    FEATURE_LINK_FIELD, INCLUDED_TYPES_FILE, MAPPING_NAMESPACE, MAPPING_PREFIX, XLINK_URI,
    XSI_NIL_LOCAL, XSI_PREFIX, XSI_URI,
};
pub use namespaces::{NamespaceRegistry, SYNTHETIC_PREFIX};
pub use path::attribute_xpath;
pub use store::{AttributeHandle, FeatureTypeHandle, MappingStore};
