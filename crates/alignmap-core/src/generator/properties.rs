//! Property-level transformation handlers
//!
//! A shared template classifies each property cell (identifier, XML
//! attribute, geometry, plain element, repeated or anonymous-sequence
//! element) and emits the corresponding attribute-mapping fragment; the
//! per-transformation handlers only contribute the source-expression
//! string.
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use super::context::{Dialect, MappingContext};
use crate::error::{Error, Result};
use crate::expression;
use crate::mapping::{
    attribute_xpath, AnonymousAttribute, AttributeExpression, AttributeHandle, ClientProperty,
    MultiValueJoin, XLINK_URI, XSI_NIL_LOCAL, XSI_PREFIX, XSI_URI,
};
use crate::model::{
    find_longest_nested_path, functions, Cell, Entity, PropertyDefinition, ResolvedStep,
    TypeDefinition,
};
use tracing::warn;

/// Handle one property cell in the scope of its type cell.
///
/// Returns the attribute mapping the cell contributed to, or `None` when
/// the cell was deliberately not mapped here (properties of another chain,
/// structurally unmappable targets).
pub fn handle_property_cell(
    type_cell: &Cell,
    cell: &Cell,
    context: &mut MappingContext,
) -> Result<Option<AttributeHandle>> {
    if !matches!(
        cell.transformation.as_str(),
        functions::RENAME | functions::ASSIGN | functions::FORMATTED_STRING
    ) {
        return Err(Error::UnsupportedTransformation {
            identifier: cell.transformation.clone(),
            context: Some(format!("property cell '{}'", cell.id)),
        });
    }

    let target_entity = cell
        .first_target()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "no target property has been specified"))?
        .clone();
    let (_, target_path) = context.resolve_target_entity(&target_entity)?;
    let target_property = target_path
        .last()
        .ok_or_else(|| Error::invalid_cell(&cell.id, "target property path is empty"))?
        .property
        .clone();

    // the owning feature type: for joins the chain configuration decides
    // which nesting level this property belongs to
    let mut mapping_name: Option<String> = None;
    let mut feature_type: Option<&TypeDefinition> = None;
    if type_cell.transformation == functions::JOIN {
        match &context.chaining {
            Some(chaining) => {
                if let Some(chain) =
                    find_longest_nested_path(&target_entity.path, chaining.chains(&type_cell.id))
                {
                    feature_type = context.chain_nested_type(chain).ok();
                    mapping_name = chain.mapping_name.clone();
                }
            }
            None => {
                // best-effort attempt to determine the target feature type,
                // may result in incorrect mappings
                feature_type = find_owning_type(&target_path, &context.relevant_types);
            }
        }
    }
    let feature_type = match feature_type {
        Some(found) => found,
        None => {
            let target = type_cell.first_target().ok_or_else(|| {
                Error::invalid_cell(&type_cell.id, "no target type has been specified")
            })?;
            context.type_definition(&target.type_name)?
        }
    };

    // don't map properties that belong to a feature chaining configuration
    // other than the current one; they are (or will be) handled while
    // processing their own chain
    if let Some(chaining) = &context.chaining {
        for chains in chaining.joins.values() {
            if let Some(chain) = find_longest_nested_path(&target_entity.path, chains) {
                let same_level = context
                    .chain_nested_type(chain)
                    .map(|nested| nested.name.matches(&feature_type.name))
                    .unwrap_or(false);
                if !same_level && !is_href_linked(cell, feature_type) {
                    return Ok(None);
                }
            }
        }
    }

    if is_valid_feature_type(feature_type) {
        context
            .store
            .get_or_create_feature_type_mapping(feature_type, mapping_name.as_deref(), false);
    }

    let expr = source_expression(cell, context)?;
    let mapping_name = mapping_name.as_deref();

    if target_property.attribute {
        if target_property.identifier {
            let parent_name = target_path
                .last()
                .map(|step| step.parent_type.clone())
                .unwrap_or_else(|| feature_type.name.clone());
            if parent_name.matches(&feature_type.name) {
                return handle_as_feature_identifier(
                    context,
                    feature_type,
                    mapping_name,
                    &target_path,
                    expr,
                );
            }
            let parent_is_geometry = context
                .target_space
                .type_by_name(&parent_name)
                .map(|t| t.is_geometry())
                .unwrap_or(false);
            if parent_is_geometry {
                return handle_as_geometry_identifier(
                    context,
                    feature_type,
                    mapping_name,
                    &target_path,
                    expr,
                );
            }
        }
        handle_as_xml_attribute(
            context,
            feature_type,
            mapping_name,
            &target_entity,
            &target_path,
            &target_property,
            expr,
        )
    } else {
        handle_as_xml_element(
            context,
            type_cell,
            cell,
            feature_type,
            mapping_name,
            &target_entity,
            &target_path,
            &target_property,
            expr,
        )
    }
}

/// Reference types, unbounded anonymous sequences and bare anonymous types
/// are not valid targets for direct mapping.
fn is_valid_feature_type(definition: &TypeDefinition) -> bool {
    !definition.is_reference()
        && !definition.is_unbounded_sequence()
        && !definition.is_anonymous()
}

/// Walk the path leaf-to-root and return the first declaring type that is
/// among the mapping-relevant target types.
fn find_owning_type<'a>(
    path: &[ResolvedStep],
    relevant_types: &[&'a TypeDefinition],
) -> Option<&'a TypeDefinition> {
    for step in path.iter().rev() {
        if let Some(found) = relevant_types
            .iter()
            .find(|t| t.name.matches(&step.parent_type))
        {
            return Some(found);
        }
    }
    None
}

/// An `xlink:href` attribute of the current feature type, fed by a
/// rename/formatted-string transformation. Such cells stay with the current
/// level even when a foreign chain matches their path.
fn is_href_linked(cell: &Cell, feature_type: &TypeDefinition) -> bool {
    if !functions::is_href_compatible(&cell.transformation) {
        return false;
    }
    cell.first_target().map_or(false, |target| {
        target.type_name.matches(&feature_type.name)
            && target
                .last_step()
                .map_or(false, |step| {
                    step.name.local == "href" && step.name.namespace == XLINK_URI
                })
    })
}

/// The identifier property of the feature type itself: an id expression on
/// the mapping, not a generic attribute.
fn handle_as_feature_identifier(
    context: &mut MappingContext,
    feature_type: &TypeDefinition,
    mapping_name: Option<&str>,
    target_path: &[ResolvedStep],
    expr: String,
) -> Result<Option<AttributeHandle>> {
    let Some(attribute) =
        context
            .store
            .get_or_create_attribute_mapping(feature_type, mapping_name, target_path)
    else {
        return Ok(None);
    };
    let element = context
        .store
        .feature_type(context.store.attribute_owner(attribute))
        .target_element
        .clone();
    let mapping = context.store.attribute_mut(attribute);
    mapping.target_attribute = Some(element);
    mapping.id_expression = Some(AttributeExpression::ocql(expr));
    Ok(Some(attribute))
}

/// The identifier of a geometry sub-object: the id expression goes on the
/// geometry's own attribute mapping.
fn handle_as_geometry_identifier(
    context: &mut MappingContext,
    feature_type: &TypeDefinition,
    mapping_name: Option<&str>,
    target_path: &[ResolvedStep],
    expr: String,
) -> Result<Option<AttributeHandle>> {
    let geometry_path = &target_path[..target_path.len().saturating_sub(1)];
    let anchor = geometry_anchor(context, geometry_path);
    let Some(attribute) =
        context
            .store
            .get_or_create_attribute_mapping(feature_type, mapping_name, &anchor)
    else {
        return Ok(None);
    };
    context.store.attribute_mut(attribute).id_expression =
        Some(AttributeExpression::ocql(expr));
    Ok(Some(attribute))
}

/// XML attributes become client properties of the parent element's
/// attribute mapping, deduplicated by qualified name.
fn handle_as_xml_attribute(
    context: &mut MappingContext,
    feature_type: &TypeDefinition,
    mapping_name: Option<&str>,
    target_entity: &Entity,
    target_path: &[ResolvedStep],
    target_property: &PropertyDefinition,
    expr: String,
) -> Result<Option<AttributeHandle>> {
    let feature_type = if feature_type.is_anonymous() {
        context.type_definition(&target_entity.type_name)?
    } else {
        feature_type
    };

    if target_path.len() < 2 {
        // an attribute needs a parent element to attach to
        return Ok(None);
    }
    let parent_path = &target_path[..target_path.len() - 1];
    let Some(parent_property) = parent_path
        .last()
        .map(|step| &step.property)
        .filter(|p| !p.group)
        .cloned()
    else {
        return Ok(None);
    };

    let Some(attribute) =
        context
            .store
            .get_or_create_attribute_mapping(feature_type, mapping_name, parent_path)
    else {
        return Ok(None);
    };
    let xpath = attribute_xpath(context.store.namespaces_mut(), feature_type, parent_path);
    let property_name = context
        .store
        .namespaces_mut()
        .qualified(&target_property.name);

    let mut needs_nil = false;
    {
        let mapping = context.store.attribute_mut(attribute);
        if mapping
            .target_attribute
            .as_deref()
            .map_or(true, str::is_empty)
        {
            mapping.target_attribute = Some(xpath);
        }
        // constant client properties force the element to be encoded even
        // when it carries no value
        if expression::is_literal(&expr) {
            mapping.encode_if_empty = true;
        }
        if !mapping.has_client_property(&property_name) {
            mapping.client_properties.push(ClientProperty {
                name: property_name,
                value: expr.clone(),
            });
            needs_nil = target_property.is_nil_reason()
                && parent_property.nillable
                && mapping.source_expression.is_none();
        }
    }
    if needs_nil {
        // encode xsi:nil with the same logic as nilReason: null when the
        // reason is null and vice versa
        add_or_replace_xsi_nil(context, attribute, &expr, true);
    }

    Ok(Some(attribute))
}

/// Regular XML elements, including the geometry, anonymous-sequence and
/// repeated-element special cases.
#[allow(clippy::too_many_arguments)]
fn handle_as_xml_element(
    context: &mut MappingContext,
    type_cell: &Cell,
    cell: &Cell,
    feature_type: &TypeDefinition,
    mapping_name: Option<&str>,
    target_entity: &Entity,
    target_path: &[ResolvedStep],
    target_property: &PropertyDefinition,
    expr: String,
) -> Result<Option<AttributeHandle>> {
    let target_space = context.target_space;
    let property_type = target_property
        .type_name
        .as_ref()
        .and_then(|name| target_space.type_by_name(name));

    let attribute = if let Some(geometry_type) =
        property_type.filter(|t| t.is_geometry())
    {
        match handle_geometry_element(
            context,
            feature_type,
            mapping_name,
            target_path,
            geometry_type,
        )? {
            Some(attribute) => attribute,
            None => return Ok(None),
        }
    } else if context.dialect.anonymous_sequences_enabled() && feature_type.is_anonymous() {
        return process_anonymous_sequence(
            context,
            type_cell,
            cell,
            feature_type,
            target_entity,
            target_path,
            target_property,
            expr,
        );
    } else if context.dialect.sequence_elements_enabled()
        && is_sequence_element(type_cell, cell, target_path)
    {
        return process_sequence_element(context, type_cell, cell, target_entity, target_path, expr);
    } else {
        let Some(attribute) =
            context
                .store
                .get_or_create_attribute_mapping(feature_type, mapping_name, target_path)
        else {
            return Ok(None);
        };
        let xpath = attribute_xpath(context.store.namespaces_mut(), feature_type, target_path);
        context.store.attribute_mut(attribute).target_attribute = Some(xpath);
        attribute
    };

    {
        let mapping = context.store.attribute_mut(attribute);
        mapping.source_expression = Some(AttributeExpression::ocql(expr.clone()));
        if target_property.cardinality.is_multiple() {
            mapping.is_multiple = true;
        }
    }
    if target_property.nillable {
        // xsi:nil with inverted logic: null when the source expression is
        // not null, and vice versa
        add_or_replace_xsi_nil(context, attribute, &expr, false);
    }

    Ok(Some(attribute))
}

/// Geometry elements anchor at the geometry's own property path; the
/// concrete geometry type goes into `targetAttributeNode` and the target
/// attribute points at the abstract geometry parent slot.
fn handle_geometry_element(
    context: &mut MappingContext,
    feature_type: &TypeDefinition,
    mapping_name: Option<&str>,
    target_path: &[ResolvedStep],
    geometry_type: &TypeDefinition,
) -> Result<Option<AttributeHandle>> {
    let anchor = geometry_anchor(context, target_path);
    let Some(attribute) =
        context
            .store
            .get_or_create_attribute_mapping(feature_type, mapping_name, &anchor)
    else {
        return Ok(None);
    };

    let node = context
        .store
        .namespaces_mut()
        .qualified(&geometry_type.name);
    let geometry_prefix = context
        .store
        .namespaces_mut()
        .prefix_for(&geometry_type.name);

    // the parent slot is renamed by the schema reader, so its segment is
    // rebuilt from the display name with the geometry namespace prefix
    let parent_path = &target_path[..target_path.len().saturating_sub(1)];
    let base = attribute_xpath(context.store.namespaces_mut(), feature_type, parent_path);
    let parent_segment = match (geometry_prefix, parent_path.last()) {
        (Some(prefix), Some(step)) if !prefix.is_empty() => {
            format!("{}:{}", prefix, step.property.name.local)
        }
        (_, Some(step)) => step.property.name.local.clone(),
        (_, None) => String::new(),
    };
    let target = match (base.is_empty(), parent_segment.is_empty()) {
        (false, false) => format!("{}/{}", base, parent_segment),
        (true, false) => parent_segment,
        _ => base,
    };

    let mapping = context.store.attribute_mut(attribute);
    mapping.target_attribute_node = Some(node);
    mapping.target_attribute = Some(target);

    Ok(Some(attribute))
}

/// Shortest path prefix ending in a geometry-typed property; used to anchor
/// geometry attribute mappings.
fn geometry_anchor(context: &MappingContext, path: &[ResolvedStep]) -> Vec<ResolvedStep> {
    for (index, step) in path.iter().enumerate() {
        let is_geometry = step
            .property
            .type_name
            .as_ref()
            .and_then(|name| context.target_space.type_by_name(name))
            .map(|t| t.is_geometry())
            .unwrap_or(false);
        if is_geometry {
            return path[..=index].to_vec();
        }
    }
    path.to_vec()
}

/// A repeated element under a join: one source row carries many values.
fn is_sequence_element(type_cell: &Cell, cell: &Cell, path: &[ResolvedStep]) -> bool {
    type_cell.transformation == functions::JOIN
        && cell.first_source().is_some()
        && path
            .last()
            .map_or(false, |step| step.property.cardinality.is_unbounded())
}

fn process_sequence_element(
    context: &mut MappingContext,
    type_cell: &Cell,
    cell: &Cell,
    target_entity: &Entity,
    target_path: &[ResolvedStep],
    expr: String,
) -> Result<Option<AttributeHandle>> {
    let root_type = context.type_definition(&target_entity.type_name)?;
    let Some(attribute) = context
        .store
        .get_or_create_attribute_mapping(root_type, None, target_path)
    else {
        return Ok(None);
    };
    let xpath = attribute_xpath(context.store.namespaces_mut(), root_type, target_path);
    let join = multi_value_join(type_cell, cell);

    let mapping = context.store.attribute_mut(attribute);
    mapping.target_attribute = Some(xpath);
    if mapping.multi_value_join.is_none() {
        mapping.multi_value_join = join;
    }
    if let Some(descriptor) = mapping.multi_value_join.as_mut() {
        descriptor.target_value = Some(expr);
    }

    Ok(Some(attribute))
}

/// An anonymous unbounded multi-value sequence: the attribute mapping is
/// keyed on the parent path and each mapped property becomes a synthesized
/// anonymous attribute instead of a fresh record.
#[allow(clippy::too_many_arguments)]
fn process_anonymous_sequence(
    context: &mut MappingContext,
    type_cell: &Cell,
    cell: &Cell,
    feature_type: &TypeDefinition,
    target_entity: &Entity,
    target_path: &[ResolvedStep],
    target_property: &PropertyDefinition,
    expr: String,
) -> Result<Option<AttributeHandle>> {
    if !(feature_type.is_unbounded_sequence() && join_sources_include(type_cell, cell)) {
        return Ok(None);
    }

    let root_type = context.type_definition(&target_entity.type_name)?;
    let first_step = target_path[..1].to_vec();
    let Some(attribute) = context
        .store
        .get_or_create_attribute_mapping(root_type, None, &first_step)
    else {
        return Ok(None);
    };
    let xpath = attribute_xpath(context.store.namespaces_mut(), root_type, &first_step);
    let attribute_name = context
        .store
        .namespaces_mut()
        .qualified(&target_property.name);
    let join = multi_value_join(type_cell, cell);

    let mapping = context.store.attribute_mut(attribute);
    mapping.target_attribute = Some(xpath);
    if mapping.multi_value_join.is_none() {
        mapping.multi_value_join = join;
    }
    if !mapping.has_anonymous_attribute(&attribute_name) {
        mapping.anonymous_attributes.push(AnonymousAttribute {
            name: attribute_name,
            value: expr,
        });
    }

    Ok(Some(attribute))
}

/// Does the property cell's source type take part in the owning join?
fn join_sources_include(type_cell: &Cell, cell: &Cell) -> bool {
    let Some(source) = cell.first_source() else {
        return false;
    };
    type_cell.transformation == functions::JOIN
        && type_cell
            .source
            .iter()
            .any(|entity| entity.type_name.matches(&source.type_name))
}

/// Build the multi-valued join descriptor from the owning join's first
/// condition.
fn multi_value_join(type_cell: &Cell, cell: &Cell) -> Option<MultiValueJoin> {
    let target_table = cell.first_source()?.type_name.local.clone();
    let join = type_cell.parameter("join")?.as_join()?;
    let condition = join.conditions.first()?;
    Some(MultiValueJoin {
        target_table,
        source_column: condition.base_column()?.to_string(),
        target_column: condition.join_column()?.to_string(),
        target_value: None,
    })
}

/// Add an `xsi:nil` client property to the attribute mapping, or update the
/// existing one.
fn add_or_replace_xsi_nil(
    context: &mut MappingContext,
    attribute: AttributeHandle,
    source_expression: &str,
    same_logic: bool,
) {
    context.get_or_create_namespace(XSI_URI, XSI_PREFIX);
    let name = format!("{}:{}", XSI_PREFIX, XSI_NIL_LOCAL);
    let value = if same_logic {
        expression::xsi_nil_same_logic(source_expression)
    } else {
        expression::xsi_nil_inverted_logic(source_expression)
    };

    let mapping = context.store.attribute_mut(attribute);
    match mapping.client_property_mut(&name) {
        Some(existing) => existing.value = value,
        None => mapping.client_properties.push(ClientProperty { name, value }),
    }
}

/// The source-expression step supplied per transformation kind.
fn source_expression(cell: &Cell, context: &MappingContext) -> Result<String> {
    match cell.transformation.as_str() {
        functions::RENAME => {
            let source = cell.first_source().ok_or_else(|| {
                Error::invalid_cell(&cell.id, "rename requires a source property")
            })?;
            let column = source
                .last_step()
                .map(|step| step.name.local.clone())
                .unwrap_or_else(|| source.type_name.local.clone());

            let mut expr = column.clone();
            if context.dialect == Dialect::DocumentStore {
                if let Some(path) = context.relative_document_path(source) {
                    expr = expression::json_select(&path);
                }
            }

            // conditions are supported only on simple (not nested) properties
            if source.path.len() == 1 {
                if let Some(condition) = &source.path[0].condition {
                    warn!(
                        cell = %cell.id,
                        "conditional source expression passes a filter where if_then_else \
                         expects an expression; the downstream engine cannot evaluate it"
                    );
                    expr = expression::conditional(condition, &column, &expr);
                }
            }
            Ok(expr)
        }
        functions::ASSIGN => {
            let value = cell
                .parameter("value")
                .and_then(|v| v.as_text())
                .ok_or_else(|| Error::invalid_cell(&cell.id, "assign requires a value parameter"))?;
            Ok(expression::quote_literal(value))
        }
        functions::FORMATTED_STRING => {
            let pattern = cell.parameter("pattern").and_then(|v| v.as_text()).ok_or_else(
                || Error::invalid_cell(&cell.id, "formatted-string requires a pattern parameter"),
            )?;
            Ok(expression::str_concat(&expression::pattern_parts(pattern)))
        }
        other => Err(Error::UnsupportedTransformation {
            identifier: other.to_string(),
            context: Some(format!("property cell '{}'", cell.id)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingStore;
    use crate::model::{
        Alignment, Cardinality, ChildStep, Name, Schema, SchemaSpace, TypeKind,
    };
    use std::collections::BTreeMap;

    fn ex(local: &str) -> Name {
        Name::with_prefix("http://example.com/ex", local, "ex")
    }

    fn target_space() -> SchemaSpace {
        let mut parcel = TypeDefinition::new(ex("Parcel"), TypeKind::Feature);

        let mut id = PropertyDefinition::new(ex("id"));
        id.attribute = true;
        id.identifier = true;
        parcel.children.push(id);

        let mut area = PropertyDefinition::new(ex("area"));
        area.type_name = Some(ex("AreaType"));
        parcel.children.push(area);

        let mut status = PropertyDefinition::new(ex("status"));
        status.nillable = true;
        parcel.children.push(status);

        let mut remarks = PropertyDefinition::new(ex("remarks"));
        remarks.cardinality = Cardinality::unbounded();
        parcel.children.push(remarks);

        let mut area_type = TypeDefinition::new(ex("AreaType"), TypeKind::Object);
        let mut uom = PropertyDefinition::new(ex("uom"));
        uom.attribute = true;
        area_type.children.push(uom);
        let mut nil_reason = PropertyDefinition::new(Name::local("nilReason"));
        nil_reason.attribute = true;
        area_type.children.push(nil_reason);

        SchemaSpace::new(vec![Schema {
            location: "http://example.com/parcels.xsd".to_string(),
            namespace: "http://example.com/ex".to_string(),
            types: vec![parcel, area_type],
        }])
    }

    fn type_cell() -> Cell {
        Cell {
            id: "t1".to_string(),
            transformation: functions::RETYPE.to_string(),
            source: vec![Entity::type_ref(Name::local("Parcel"))],
            target: vec![Entity::type_ref(ex("Parcel"))],
            parameters: BTreeMap::new(),
            parent: None,
        }
    }

    fn rename_cell(id: &str, source_path: &[&str], target_path: &[&str]) -> Cell {
        Cell {
            id: id.to_string(),
            transformation: functions::RENAME.to_string(),
            source: vec![Entity::property_ref(
                Name::local("Parcel"),
                source_path
                    .iter()
                    .map(|p| ChildStep::new(Name::local(*p)))
                    .collect(),
            )],
            target: vec![Entity::property_ref(
                ex("Parcel"),
                target_path
                    .iter()
                    .map(|p| ChildStep::new(ex(p)))
                    .collect(),
            )],
            parameters: BTreeMap::new(),
            parent: Some("t1".to_string()),
        }
    }

    fn context<'a>(alignment: &'a Alignment, space: &'a SchemaSpace) -> MappingContext<'a> {
        MappingContext::new(
            MappingStore::new(false),
            alignment,
            space,
            None,
            None,
            None,
            Dialect::Relational,
        )
    }

    #[test]
    fn test_plain_element() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let cell = rename_cell("p1", &["AREA"], &["area"]);
        let handle = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        let mapping = ctx.store.attribute(handle);
        assert_eq!(mapping.target_attribute.as_deref(), Some("ex:area"));
        assert_eq!(
            mapping.source_expression.as_ref().unwrap().ocql.as_deref(),
            Some("AREA")
        );
        assert!(!mapping.is_multiple);
    }

    #[test]
    fn test_unbounded_element_sets_multiplicity() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let cell = rename_cell("p1", &["REMARKS"], &["remarks"]);
        let handle = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        assert!(ctx.store.attribute(handle).is_multiple);
    }

    #[test]
    fn test_nillable_element_gets_inverted_xsi_nil() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let cell = rename_cell("p1", &["STATUS"], &["status"]);
        let handle = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        let mapping = ctx.store.attribute(handle);
        let nil = mapping.client_property("xsi:nil").unwrap();
        assert_eq!(
            nil.value,
            "if_then_else(isNull(STATUS), 'true', Expression.NIL)"
        );
    }

    #[test]
    fn test_feature_identifier() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let cell = rename_cell("p1", &["ID"], &["id"]);
        let handle = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        let mapping = ctx.store.attribute(handle);
        assert_eq!(mapping.target_attribute.as_deref(), Some("ex:Parcel"));
        assert_eq!(
            mapping.id_expression.as_ref().unwrap().ocql.as_deref(),
            Some("ID")
        );
        assert!(mapping.client_properties.is_empty());
    }

    #[test]
    fn test_xml_attribute_becomes_client_property() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let cell = rename_cell("p1", &["AREA_UOM"], &["area", "uom"]);
        let handle = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        let mapping = ctx.store.attribute(handle);
        assert_eq!(mapping.target_attribute.as_deref(), Some("ex:area"));
        let client = mapping.client_property("ex:uom").unwrap();
        assert_eq!(client.value, "AREA_UOM");

        // reprocessing the same attribute never adds a duplicate
        let again = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(handle, again);
        assert_eq!(ctx.store.attribute(again).client_properties.len(), 1);
    }

    #[test]
    fn test_assign_literal_sets_encode_if_empty() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let mut cell = rename_cell("p1", &[], &["area", "uom"]);
        cell.transformation = functions::ASSIGN.to_string();
        cell.source.clear();
        cell.parameters.insert(
            "value".to_string(),
            vec![crate::model::ParameterValue::Text("m2".to_string())],
        );
        let handle = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        let mapping = ctx.store.attribute(handle);
        assert!(mapping.encode_if_empty);
        assert_eq!(mapping.client_property("ex:uom").unwrap().value, "'m2'");
    }

    #[test]
    fn test_unsupported_property_transformation() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let mut cell = rename_cell("p1", &["AREA"], &["area"]);
        cell.transformation = "interpolate".to_string();
        let err = handle_property_cell(&type_cell(), &cell, &mut ctx).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_conditional_rename_is_wrapped() {
        let alignment = Alignment::default();
        let space = target_space();
        let mut ctx = context(&alignment, &space);

        let mut cell = rename_cell("p1", &["AREA"], &["area"]);
        cell.source[0].path[0].condition = Some("value > 100".to_string());
        let handle = handle_property_cell(&type_cell(), &cell, &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(
            ctx.store
                .attribute(handle)
                .source_expression
                .as_ref()
                .unwrap()
                .ocql
                .as_deref(),
            Some("if_then_else(AREA > 100, AREA, Expression.NIL)")
        );
    }
}
