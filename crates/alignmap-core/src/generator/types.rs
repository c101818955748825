//! Type-level transformation handlers
//!
//! One handler per type transformation kind. Each handler produces (or
//! locates) the feature-type mapping owning the type cell's output, plus any
//! synthetic attributes the transformation implies (join links, identifier
//! expressions).
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use super::context::MappingContext;
use crate::error::{Error, Result};
use crate::expression;
use crate::mapping::{
    attribute_xpath, AttributeExpression, AttributeMapping, FeatureTypeHandle,
};
use crate::model::{functions, Cell, ChainConfiguration, Name, TypeDefinition};

/// Dispatch a type cell to the handler registered for its transformation
/// identifier.
pub fn handle_type_cell(cell: &Cell, context: &mut MappingContext) -> Result<FeatureTypeHandle> {
    match cell.transformation.as_str() {
        functions::RETYPE => handle_retype(cell, context),
        functions::MERGE => handle_merge(cell, context),
        functions::JOIN => handle_join(cell, context),
        other => Err(Error::UnsupportedTransformation {
            identifier: other.to_string(),
            context: Some(format!("type cell '{}'", cell.id)),
        }),
    }
}

/// Label used as the `sourceType` of a mapping: the document-store root key
/// when the source carries a path tag, else its display name.
fn source_label(context: &MappingContext, name: &Name) -> String {
    match context.source_type(name) {
        Some(definition) => definition
            .path_tag
            .as_ref()
            .map(|tag| tag.root_key.clone())
            .unwrap_or_else(|| definition.element_name().to_string()),
        None => name.local.clone(),
    }
}

/// Plain retype: one source type to one target type.
fn handle_retype(cell: &Cell, context: &mut MappingContext) -> Result<FeatureTypeHandle> {
    let source = cell
        .first_source()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no source type has been specified"))?;
    let target = cell
        .first_target()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no target type has been specified"))?;
    let target_type = context.type_definition(&target.type_name)?;

    let source_definition = context.source_type(&source.type_name);
    let source_tag = source_definition.and_then(|t| t.path_tag.as_ref());

    let (mapping_name, secondary) = match source_tag {
        Some(tag) => {
            // a source whose collection differs from its own type name is a
            // nested extraction of that collection, not a top-level mapping
            let display = source_definition
                .map(|t| t.element_name().to_string())
                .unwrap_or_else(|| source.type_name.local.clone());
            (
                Some(format!("{}-{}", tag.root_key, target_type.element_name())),
                tag.root_key != display,
            )
        }
        None => (None, false),
    };

    let label = source_label(context, &source.type_name);
    let handle = context.store.get_or_create_feature_type_mapping(
        target_type,
        mapping_name.as_deref(),
        secondary,
    );
    context.store.feature_type_mut(handle).source_type = Some(label);

    Ok(handle)
}

/// Structural merge: several source types into one target type. The output
/// format has a single `sourceType` slot, so the first-encountered source
/// entity provides the label.
fn handle_merge(cell: &Cell, context: &mut MappingContext) -> Result<FeatureTypeHandle> {
    let source = cell
        .first_source()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no source type has been specified"))?;
    let target = cell
        .first_target()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no target type has been specified"))?;
    let target_type = context.type_definition(&target.type_name)?;

    let label = source_label(context, &source.type_name);
    let handle = context
        .store
        .get_or_create_feature_type_mapping(target_type, None, false);
    context.store.feature_type_mut(handle).source_type = Some(label);

    Ok(handle)
}

/// Relational join producing a container mapping plus one nested mapping
/// per registered chain, stitched together by a matching pair of
/// `FEATURE_LINK[n]` expressions.
fn handle_join(cell: &Cell, context: &mut MappingContext) -> Result<FeatureTypeHandle> {
    let join = cell
        .parameter("join")
        .and_then(|value| value.as_join())
        .cloned()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "join parameter missing"))?;
    if join.types.len() < 2 {
        return Err(Error::invalid_cell(&cell.id, "join requires at least two types"));
    }
    let condition = join
        .conditions
        .first()
        .cloned()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "join requires at least one condition"))?;

    let target = cell
        .first_target()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no target type has been specified"))?;
    let container_type = context.type_definition(&target.type_name)?;
    let container_label = source_label(context, &join.types[0]);
    let container = context
        .store
        .get_or_create_feature_type_mapping(container_type, None, false);
    context.store.feature_type_mut(container).source_type = Some(container_label);

    let chains: Vec<ChainConfiguration> = context
        .chaining
        .as_ref()
        .map(|chaining| chaining.chains(&cell.id).to_vec())
        .unwrap_or_default();
    if chains.is_empty() {
        return Err(Error::invalid_cell(
            &cell.id,
            "no chain configuration registered for join",
        ));
    }

    for chain in &chains {
        let nested_type = context.chain_nested_type(chain)?;
        let nested_label = source_label(context, &condition.join.type_name);
        let nested = context.store.get_or_create_feature_type_mapping(
            nested_type,
            chain.mapping_name.as_deref(),
            true,
        );
        context.store.feature_type_mut(nested).source_type = Some(nested_label);

        let (chain_owner, nested_path) = context.resolve_target_entity(&chain.nested_target)?;
        if let Some(attribute) =
            context
                .store
                .get_or_create_attribute_mapping(chain_owner, None, &nested_path)
        {
            let xpath = attribute_xpath(context.store.namespaces_mut(), chain_owner, &nested_path);
            let link_field = context
                .store
                .unique_feature_link_attribute(nested_type, chain.mapping_name.as_deref());
            let link_element = context.store.feature_type(nested).link_label();
            let base_column = condition.base_column().unwrap_or_default().to_string();
            let join_column = condition.join_column().unwrap_or_default().to_string();

            let mapping = context.store.attribute_mut(attribute);
            mapping.target_attribute = Some(xpath);
            mapping.is_multiple = true;
            mapping.source_expression = Some(AttributeExpression {
                ocql: Some(base_column),
                link_element: Some(link_element),
                link_field: Some(link_field.clone()),
                ..Default::default()
            });

            context.store.push_attribute(
                nested,
                AttributeMapping {
                    target_attribute: Some(link_field),
                    source_expression: Some(AttributeExpression::ocql(join_column)),
                    ..Default::default()
                },
            );
        }

        ensure_identifier_expression(context, nested);
    }

    Ok(container)
}

/// Document-store collection link, attached to a property cell but handled
/// as a type-level transformation: registers the nested mapping for a
/// linked collection and the synthetic link pair addressing it.
pub fn handle_collection_link(
    cell: &Cell,
    context: &mut MappingContext,
) -> Result<FeatureTypeHandle> {
    let source = cell
        .first_source()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no source property has been specified"))?;
    let target = cell
        .first_target()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no target property has been specified"))?;

    let document_path: Vec<&str> = source.path.iter().map(|s| s.name.local.as_str()).collect();
    if document_path.is_empty() {
        return Err(Error::invalid_cell(
            &cell.id,
            "collection link requires a source property path",
        ));
    }
    let document_path = document_path.join(".");

    let root_key = context
        .source_type(&source.type_name)
        .and_then(|t| t.path_tag.as_ref())
        .map(|tag| tag.root_key.clone())
        .ok_or_else(|| {
            Error::invalid_cell(&cell.id, "source type carries no document path tag")
        })?;

    let (container_type, target_path) = context.resolve_target_entity(target)?;
    let leaf_type_name = target_path
        .last()
        .and_then(|step| step.property.type_name.clone())
        .ok_or_else(|| Error::SchemaLookup {
            message: format!(
                "collection link target '{}' has no complex property type",
                target.type_name
            ),
        })?;
    let nested_type = context.xml_property_type(context.type_definition(&leaf_type_name)?);

    let nested_name = format!("{}-{}", root_key, nested_type.element_name());
    let nested = context
        .store
        .get_or_create_feature_type_mapping(nested_type, Some(&nested_name), true);
    context.store.feature_type_mut(nested).source_type = Some(root_key.clone());

    let container_name = format!("{}-{}", root_key, container_type.element_name());
    if let Some(attribute) = context.store.get_or_create_attribute_mapping(
        container_type,
        Some(&container_name),
        &target_path,
    ) {
        let xpath = attribute_xpath(context.store.namespaces_mut(), container_type, &target_path);

        // properties of the linked collection resolve to the nested mapping
        // through this chain
        let mut chain = ChainConfiguration::new(target.clone());
        chain.mapping_name = Some(nested_name.clone());
        context
            .chaining
            .get_or_insert_with(Default::default)
            .put_chain(document_path.clone(), chain);

        let link_type: &TypeDefinition = context
            .source_type(&source.type_name)
            .unwrap_or(nested_type);
        let link_field = context
            .store
            .unique_feature_link_attribute(link_type, Some(&nested_name));
        let link_element = context.store.feature_type(nested).link_label();

        let mapping = context.store.attribute_mut(attribute);
        mapping.target_attribute = Some(xpath);
        mapping.is_multiple = true;
        mapping.source_expression = Some(AttributeExpression {
            ocql: Some(expression::collection_link(&document_path)),
            link_element: Some(link_element),
            link_field: Some(link_field.clone()),
            ..Default::default()
        });

        context.store.push_attribute(
            nested,
            AttributeMapping {
                target_attribute: Some(link_field),
                source_expression: Some(AttributeExpression::ocql(
                    expression::nested_collection_link(),
                )),
                ..Default::default()
            },
        );
    }

    ensure_identifier_expression(context, nested);

    Ok(nested)
}

/// Document-store sources without a path tag lack a natural primary key
/// visible in the alignment; give their mapping a synthetic identifier
/// expression.
pub fn tag_simple_source(cell: &Cell, context: &mut MappingContext) -> Result<()> {
    let source = cell
        .first_source()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no source type has been specified"))?;
    let has_tag = context
        .source_type(&source.type_name)
        .and_then(|t| t.path_tag.as_ref())
        .is_some();
    if has_tag {
        return Ok(());
    }

    let target = cell
        .first_target()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no target type has been specified"))?;
    let target_type = context.type_definition(&target.type_name)?;
    if let Some(attribute) = context
        .store
        .get_or_create_attribute_mapping(target_type, None, &[])
    {
        let element = context
            .store
            .feature_type(context.store.attribute_owner(attribute))
            .target_element
            .clone();
        let mapping = context.store.attribute_mut(attribute);
        mapping.target_attribute = Some(element);
        mapping.id_expression = Some(AttributeExpression::ocql(expression::collection_id()));
    }

    Ok(())
}

/// Give a nested mapping a document/collection identifier expression unless
/// one of its attributes already carries one.
fn ensure_identifier_expression(context: &mut MappingContext, handle: FeatureTypeHandle) {
    let mapping = context.store.feature_type(handle);
    if mapping
        .attribute_mappings
        .iter()
        .any(|a| a.id_expression.is_some())
    {
        return;
    }
    let element = mapping.target_element.clone();
    context.store.push_attribute(
        handle,
        AttributeMapping {
            target_attribute: Some(element),
            id_expression: Some(AttributeExpression::ocql(expression::collection_id())),
            ..Default::default()
        },
    );
}
