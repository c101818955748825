//! Deployment description derived from a finished mapping
//!
//! Computes the workspace, namespace, datastore, feature-type and layer
//! records a REST-based deployment client needs to publish the mapping.
//! Every identifier is a deterministic string built from the corresponding
//! resource name.

use crate::error::{Error, Result};
use crate::generator::Dialect;
use crate::mapping::MappingDocument;
use crate::model::{Schema, WorkspaceConfiguration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a deployment client needs, in publish order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub workspace: WorkspaceResource,
    pub namespace: NamespaceResource,
    pub secondary_namespaces: Vec<NamespaceResource>,
    pub secondary_workspaces: Vec<WorkspaceResource>,
    pub datastore: DataStoreResource,
    pub feature_types: Vec<FeatureTypeResource>,
    pub layers: Vec<LayerResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceResource {
    pub id: String,
    pub name: String,
    pub isolated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceResource {
    pub id: String,
    pub prefix: String,
    pub uri: String,
    pub isolated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStoreResource {
    pub id: String,
    pub name: String,
    pub workspace_id: String,
    pub connection_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTypeResource {
    pub id: String,
    pub name: String,
    pub datastore_id: String,
    pub namespace_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResource {
    pub id: String,
    pub name: String,
    pub feature_type_id: String,
}

fn workspace_for(
    prefix: &str,
    uri: &str,
    workspaces: Option<&WorkspaceConfiguration>,
) -> WorkspaceResource {
    let name = workspaces
        .and_then(|conf| conf.workspace(uri))
        .and_then(|settings| settings.name.clone())
        .unwrap_or_else(|| prefix.to_string());
    WorkspaceResource {
        id: format!("{}_workspace", name),
        name,
        isolated: workspaces.map(|conf| conf.is_isolated(uri)).unwrap_or(false),
    }
}

fn namespace_for(
    prefix: &str,
    uri: &str,
    workspaces: Option<&WorkspaceConfiguration>,
) -> NamespaceResource {
    NamespaceResource {
        id: format!("{}_namespace", prefix),
        prefix: prefix.to_string(),
        uri: uri.to_string(),
        isolated: workspaces.map(|conf| conf.is_isolated(uri)).unwrap_or(false),
    }
}

/// The feature-type name encoded in a `{prefix}:{name}` target element.
fn strip_prefix(target_element: &str) -> &str {
    target_element
        .split_once(':')
        .map(|(_, name)| name)
        .unwrap_or(target_element)
}

/// Derive the deployment plan for a generated main document.
pub fn derive_plan(
    main: &MappingDocument,
    schema: &Schema,
    workspaces: Option<&WorkspaceConfiguration>,
    dialect: Dialect,
) -> Result<DeploymentPlan> {
    let main_namespace = main
        .namespaces
        .iter()
        .find(|ns| ns.uri == schema.namespace)
        .ok_or_else(|| Error::InvalidState {
            message: format!(
                "no namespace registered for target schema '{}'",
                schema.namespace
            ),
        })?;

    let workspace = workspace_for(&main_namespace.prefix, &main_namespace.uri, workspaces);
    let namespace = namespace_for(&main_namespace.prefix, &main_namespace.uri, workspaces);

    // a document-store mapping of a single collection is published under
    // the collection name rather than the schema name
    let mut datastore_name = schema.name().to_string();
    if dialect == Dialect::DocumentStore && main.type_mappings.len() == 1 {
        if let Some(source_type) = &main.type_mappings[0].source_type {
            datastore_name = source_type.clone();
        }
    }

    let mut connection_parameters = BTreeMap::new();
    connection_parameters.insert("uri".to_string(), namespace.uri.clone());
    connection_parameters.insert("workspaceName".to_string(), workspace.name.clone());
    connection_parameters.insert(
        "mappingFileName".to_string(),
        format!("{}.xml", datastore_name),
    );

    let datastore = DataStoreResource {
        id: format!("{}_datastore", datastore_name),
        name: datastore_name,
        workspace_id: workspace.id.clone(),
        connection_parameters,
    };

    let feature_types: Vec<FeatureTypeResource> = main
        .type_mappings
        .iter()
        .map(|mapping| {
            let name = strip_prefix(&mapping.target_element).to_string();
            FeatureTypeResource {
                id: format!("{}_featureType", name),
                name,
                datastore_id: datastore.id.clone(),
                namespace_id: namespace.id.clone(),
            }
        })
        .collect();

    let layers = feature_types
        .iter()
        .map(|feature_type| LayerResource {
            id: format!("{}_layer", feature_type.name),
            name: feature_type.name.clone(),
            feature_type_id: feature_type.id.clone(),
        })
        .collect();

    let mut secondary_namespaces = Vec::new();
    let mut secondary_workspaces = Vec::new();
    for ns in &main.namespaces {
        if ns.uri != schema.namespace {
            secondary_namespaces.push(namespace_for(&ns.prefix, &ns.uri, workspaces));
            secondary_workspaces.push(workspace_for(&ns.prefix, &ns.uri, workspaces));
        }
    }

    Ok(DeploymentPlan {
        workspace,
        namespace,
        secondary_namespaces,
        secondary_workspaces,
        datastore,
        feature_types,
        layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FeatureTypeMapping, Namespace};

    fn main_document() -> MappingDocument {
        MappingDocument {
            namespaces: vec![
                Namespace {
                    prefix: "ex".to_string(),
                    uri: "http://example.com/ex".to_string(),
                },
                Namespace {
                    prefix: "gml".to_string(),
                    uri: "http://www.opengis.net/gml/3.2".to_string(),
                },
            ],
            type_mappings: vec![FeatureTypeMapping {
                target_element: "ex:Parcel".to_string(),
                source_type: Some("parcels".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn schema() -> Schema {
        Schema {
            location: "http://example.com/schemas/parcels.xsd".to_string(),
            namespace: "http://example.com/ex".to_string(),
            types: Vec::new(),
        }
    }

    #[test]
    fn test_identifier_scheme() {
        let plan = derive_plan(&main_document(), &schema(), None, Dialect::Relational).unwrap();
        assert_eq!(plan.workspace.id, "ex_workspace");
        assert_eq!(plan.namespace.id, "ex_namespace");
        assert_eq!(plan.datastore.id, "parcels_datastore");
        assert_eq!(plan.feature_types[0].id, "Parcel_featureType");
        assert_eq!(plan.layers[0].id, "Parcel_layer");
    }

    #[test]
    fn test_document_store_single_mapping_uses_source_type() {
        let plan = derive_plan(&main_document(), &schema(), None, Dialect::DocumentStore).unwrap();
        assert_eq!(plan.datastore.name, "parcels");
        assert_eq!(
            plan.datastore.connection_parameters.get("mappingFileName"),
            Some(&"parcels.xml".to_string())
        );
    }

    #[test]
    fn test_secondary_namespaces_exclude_main() {
        let plan = derive_plan(&main_document(), &schema(), None, Dialect::Relational).unwrap();
        assert_eq!(plan.secondary_namespaces.len(), 1);
        assert_eq!(plan.secondary_namespaces[0].prefix, "gml");
    }
}
