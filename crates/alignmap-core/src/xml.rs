//! XML serialization of mapping documents
//!
//! Writes the finished document tree in the element layout the downstream
//! feature-serving engine consumes. Serialization is a pure sink: it never
//! mutates the document.

use crate::error::{Error, Result};
use crate::mapping::{
    AttributeExpression, AttributeMapping, FeatureTypeMapping, MappingDocument,
    MAPPING_NAMESPACE, MAPPING_PREFIX,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Serialize a mapping document to the given writer.
pub fn write_document<W: Write>(document: &MappingDocument, out: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let root_name = format!("{}:AppSchemaDataAccess", MAPPING_PREFIX);
    let xmlns = format!("xmlns:{}", MAPPING_PREFIX);
    let mut root = BytesStart::new(root_name.as_str());
    root.push_attribute((xmlns.as_str(), MAPPING_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    start(&mut writer, "namespaces")?;
    for namespace in &document.namespaces {
        start(&mut writer, "Namespace")?;
        text_element(&mut writer, "prefix", &namespace.prefix)?;
        text_element(&mut writer, "uri", &namespace.uri)?;
        end(&mut writer, "Namespace")?;
    }
    end(&mut writer, "namespaces")?;

    if !document.includes.is_empty() {
        start(&mut writer, "includedTypes")?;
        for include in &document.includes {
            text_element(&mut writer, "Include", include)?;
        }
        end(&mut writer, "includedTypes")?;
    }

    start(&mut writer, "sourceDataStores")?;
    for datastore in &document.source_data_stores {
        start(&mut writer, "DataStore")?;
        text_element(&mut writer, "id", &datastore.id)?;
        if let Some(id_attribute) = &datastore.id_attribute {
            text_element(&mut writer, "idAttribute", id_attribute)?;
        }
        start(&mut writer, "parameters")?;
        for parameter in &datastore.parameters {
            start(&mut writer, "Parameter")?;
            text_element(&mut writer, "name", &parameter.name)?;
            text_element(&mut writer, "value", &parameter.value)?;
            end(&mut writer, "Parameter")?;
        }
        end(&mut writer, "parameters")?;
        end(&mut writer, "DataStore")?;
    }
    end(&mut writer, "sourceDataStores")?;

    if let Some(catalog) = &document.catalog {
        text_element(&mut writer, "catalog", catalog)?;
    }

    start(&mut writer, "targetTypes")?;
    start(&mut writer, "FeatureType")?;
    for schema_uri in &document.schema_uris {
        text_element(&mut writer, "schemaUri", schema_uri)?;
    }
    end(&mut writer, "FeatureType")?;
    end(&mut writer, "targetTypes")?;

    start(&mut writer, "typeMappings")?;
    for mapping in &document.type_mappings {
        write_feature_type_mapping(&mut writer, mapping)?;
    }
    end(&mut writer, "typeMappings")?;

    writer.write_event(Event::End(BytesEnd::new(root_name.as_str())))?;
    Ok(())
}

/// Serialize a mapping document to a string.
pub fn write_document_to_string(document: &MappingDocument) -> Result<String> {
    let mut buffer = Vec::new();
    write_document(document, &mut buffer)?;
    String::from_utf8(buffer).map_err(|error| Error::Internal {
        message: "serialized mapping is not valid UTF-8".to_string(),
        source: Some(anyhow::Error::new(error)),
    })
}

fn write_feature_type_mapping<W: Write>(
    writer: &mut Writer<W>,
    mapping: &FeatureTypeMapping,
) -> Result<()> {
    start(writer, "FeatureTypeMapping")?;
    if let Some(source_data_store) = &mapping.source_data_store {
        text_element(writer, "sourceDataStore", source_data_store)?;
    }
    if let Some(source_type) = &mapping.source_type {
        text_element(writer, "sourceType", source_type)?;
    }
    text_element(writer, "targetElement", &mapping.target_element)?;
    if let Some(mapping_name) = &mapping.mapping_name {
        text_element(writer, "mappingName", mapping_name)?;
    }
    if mapping.denormalised {
        text_element(writer, "isDenormalised", "true")?;
    }
    if mapping.xml_datastore {
        text_element(writer, "isXmlDataStore", "true")?;
    }
    if let Some(item_xpath) = &mapping.item_xpath {
        text_element(writer, "itemXpath", item_xpath)?;
    }

    start(writer, "attributeMappings")?;
    for attribute in &mapping.attribute_mappings {
        write_attribute_mapping(writer, attribute)?;
    }
    end(writer, "attributeMappings")?;

    end(writer, "FeatureTypeMapping")
}

fn write_attribute_mapping<W: Write>(
    writer: &mut Writer<W>,
    attribute: &AttributeMapping,
) -> Result<()> {
    start(writer, "AttributeMapping")?;
    if let Some(label) = &attribute.label {
        text_element(writer, "label", label)?;
    }
    if let Some(parent_label) = &attribute.parent_label {
        text_element(writer, "parentLabel", parent_label)?;
    }
    if let Some(target_attribute) = &attribute.target_attribute {
        text_element(writer, "targetAttribute", target_attribute)?;
    }
    if let Some(target_attribute_node) = &attribute.target_attribute_node {
        text_element(writer, "targetAttributeNode", target_attribute_node)?;
    }
    if let Some(id_expression) = &attribute.id_expression {
        write_expression(writer, "idExpression", id_expression)?;
    }
    if let Some(source_expression) = &attribute.source_expression {
        write_expression(writer, "sourceExpression", source_expression)?;
    }
    if let Some(instance_path) = &attribute.instance_path {
        text_element(writer, "instancePath", instance_path)?;
    }
    if attribute.is_multiple {
        text_element(writer, "isMultiple", "true")?;
    }
    if attribute.is_list {
        text_element(writer, "isList", "true")?;
    }
    if attribute.encode_if_empty {
        text_element(writer, "encodeIfEmpty", "true")?;
    }
    if let Some(join) = &attribute.multi_value_join {
        start(writer, "jdbcMultipleValue")?;
        text_element(writer, "sourceColumn", &join.source_column)?;
        text_element(writer, "targetTable", &join.target_table)?;
        text_element(writer, "targetColumn", &join.target_column)?;
        if let Some(target_value) = &join.target_value {
            text_element(writer, "targetValue", target_value)?;
        }
        end(writer, "jdbcMultipleValue")?;
    }
    for client_property in &attribute.client_properties {
        start(writer, "ClientProperty")?;
        text_element(writer, "name", &client_property.name)?;
        text_element(writer, "value", &client_property.value)?;
        end(writer, "ClientProperty")?;
    }
    for anonymous in &attribute.anonymous_attributes {
        start(writer, "anonymousAttribute")?;
        text_element(writer, "name", &anonymous.name)?;
        text_element(writer, "value", &anonymous.value)?;
        end(writer, "anonymousAttribute")?;
    }
    end(writer, "AttributeMapping")
}

fn write_expression<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    expression: &AttributeExpression,
) -> Result<()> {
    start(writer, name)?;
    if let Some(ocql) = &expression.ocql {
        text_element(writer, "OCQL", ocql)?;
    }
    if let Some(raw) = &expression.expression {
        text_element(writer, "expression", raw)?;
    }
    if let Some(index) = &expression.index {
        text_element(writer, "index", index)?;
    }
    if let Some(input_attribute) = &expression.input_attribute {
        text_element(writer, "inputAttribute", input_attribute)?;
    }
    if let Some(link_element) = &expression.link_element {
        text_element(writer, "linkElement", link_element)?;
    }
    if let Some(link_field) = &expression.link_field {
        text_element(writer, "linkField", link_field)?;
    }
    end(writer, name)
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    start(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    end(writer, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ClientProperty, DataStore, Namespace, Parameter};

    fn sample_document() -> MappingDocument {
        MappingDocument {
            namespaces: vec![Namespace {
                prefix: "ex".to_string(),
                uri: "http://example.com/ex".to_string(),
            }],
            includes: vec!["includedTypes.xml".to_string()],
            source_data_stores: vec![DataStore {
                id: "datastore".to_string(),
                id_attribute: None,
                parameters: vec![Parameter {
                    name: "dbtype".to_string(),
                    value: "postgis".to_string(),
                }],
            }],
            schema_uris: vec!["http://example.com/schemas/parcels.xsd".to_string()],
            type_mappings: vec![FeatureTypeMapping {
                source_data_store: Some("datastore".to_string()),
                source_type: Some("parcels".to_string()),
                target_element: "ex:Parcel".to_string(),
                attribute_mappings: vec![AttributeMapping {
                    target_attribute: Some("ex:area".to_string()),
                    source_expression: Some(AttributeExpression::ocql("AREA")),
                    client_properties: vec![ClientProperty {
                        name: "ex:uom".to_string(),
                        value: "'m2'".to_string(),
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            catalog: None,
        }
    }

    #[test]
    fn test_document_shape() {
        let xml = write_document_to_string(&sample_document()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<as:AppSchemaDataAccess xmlns:as=\"http://www.geotools.org/app-schema\">"));
        assert!(xml.contains("<prefix>ex</prefix>"));
        assert!(xml.contains("<Include>includedTypes.xml</Include>"));
        assert!(xml.contains("<sourceType>parcels</sourceType>"));
        assert!(xml.contains("<targetElement>ex:Parcel</targetElement>"));
        assert!(xml.contains("<OCQL>AREA</OCQL>"));
        assert!(xml.contains("</as:AppSchemaDataAccess>"));
    }

    #[test]
    fn test_element_order() {
        let xml = write_document_to_string(&sample_document()).unwrap();
        let namespaces = xml.find("<namespaces>").unwrap();
        let datastores = xml.find("<sourceDataStores>").unwrap();
        let target_types = xml.find("<targetTypes>").unwrap();
        let type_mappings = xml.find("<typeMappings>").unwrap();
        assert!(namespaces < datastores);
        assert!(datastores < target_types);
        assert!(target_types < type_mappings);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut document = sample_document();
        document.type_mappings[0].attribute_mappings[0]
            .source_expression = Some(AttributeExpression::ocql("if_then_else(a < b, a, b)"));
        let xml = write_document_to_string(&document).unwrap();
        assert!(xml.contains("if_then_else(a &lt; b, a, b)"));
    }
}
