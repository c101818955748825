//! Integration tests for document-store-source mapping generation

use alignmap_core::{
    functions, xml, Alignment, Cell, ChildStep, Dialect, Entity, MappingGenerator, Name,
    PathKind, PathTag, PropertyDefinition, Report, Schema, SchemaSpace, TypeDefinition,
    TypeKind,
};
use std::collections::BTreeMap;

fn ex(local: &str) -> Name {
    Name::with_prefix("http://example.com/ex", local, "ex")
}

fn tag(root: &str, key: &str, path: &str, kind: PathKind) -> PathTag {
    PathTag {
        root_key: root.to_string(),
        key: key.to_string(),
        path: path.to_string(),
        kind,
    }
}

fn source_space() -> SchemaSpace {
    let mut parcels = TypeDefinition::new(Name::local("parcels"), TypeKind::Object);
    parcels.path_tag = Some(tag("parcels", "parcels", "parcels", PathKind::Collection));
    let mut area = PropertyDefinition::new(Name::local("area"));
    area.path_tag = Some(tag("parcels", "area", "parcels.area", PathKind::Simple));
    parcels.children.push(area);
    let mut reviews = PropertyDefinition::new(Name::local("reviews"));
    reviews.path_tag = Some(tag(
        "parcels",
        "reviews",
        "parcels.reviews",
        PathKind::Collection,
    ));
    parcels.children.push(reviews);

    let mut review = TypeDefinition::new(Name::local("reviews"), TypeKind::Object);
    review.path_tag = Some(tag(
        "parcels",
        "reviews",
        "parcels.reviews",
        PathKind::Collection,
    ));
    let mut rating = PropertyDefinition::new(Name::local("rating"));
    rating.path_tag = Some(tag(
        "parcels",
        "rating",
        "parcels.reviews.rating",
        PathKind::Simple,
    ));
    review.children.push(rating);

    SchemaSpace::new(vec![Schema {
        location: "mongodb://localhost:27017/cadastre".to_string(),
        namespace: String::new(),
        types: vec![parcels, review],
    }])
}

fn target_space() -> SchemaSpace {
    let mut parcel = TypeDefinition::new(ex("Parcel"), TypeKind::Feature);
    parcel.children.push(PropertyDefinition::new(ex("area")));
    let mut review = PropertyDefinition::new(ex("review"));
    review.type_name = Some(ex("Review"));
    parcel.children.push(review);

    let mut review_type = TypeDefinition::new(ex("Review"), TypeKind::Feature);
    review_type
        .children
        .push(PropertyDefinition::new(ex("rating")));

    SchemaSpace::new(vec![Schema {
        location: "http://example.com/schemas/parcels.xsd".to_string(),
        namespace: "http://example.com/ex".to_string(),
        types: vec![parcel, review_type],
    }])
}

fn alignment() -> Alignment {
    Alignment {
        cells: vec![
            Cell {
                id: "t1".to_string(),
                transformation: functions::RETYPE.to_string(),
                source: vec![Entity::type_ref(Name::local("parcels"))],
                target: vec![Entity::type_ref(ex("Parcel"))],
                parameters: BTreeMap::new(),
                parent: None,
            },
            Cell {
                id: "p1".to_string(),
                transformation: functions::RENAME.to_string(),
                source: vec![Entity::property_ref(
                    Name::local("parcels"),
                    vec![ChildStep::new(Name::local("area"))],
                )],
                target: vec![Entity::property_ref(
                    ex("Parcel"),
                    vec![ChildStep::new(ex("area"))],
                )],
                parameters: BTreeMap::new(),
                parent: Some("t1".to_string()),
            },
            Cell {
                id: "p2".to_string(),
                transformation: functions::COLLECTION_LINK.to_string(),
                source: vec![Entity::property_ref(
                    Name::local("parcels"),
                    vec![ChildStep::new(Name::local("reviews"))],
                )],
                target: vec![Entity::property_ref(
                    ex("Parcel"),
                    vec![ChildStep::new(ex("review"))],
                )],
                parameters: BTreeMap::new(),
                parent: Some("t1".to_string()),
            },
            Cell {
                id: "t2".to_string(),
                transformation: functions::RETYPE.to_string(),
                source: vec![Entity::type_ref(Name::local("reviews"))],
                target: vec![Entity::type_ref(ex("Review"))],
                parameters: BTreeMap::new(),
                parent: None,
            },
            Cell {
                id: "p3".to_string(),
                transformation: functions::RENAME.to_string(),
                source: vec![Entity::property_ref(
                    Name::local("reviews"),
                    vec![ChildStep::new(Name::local("rating"))],
                )],
                target: vec![Entity::property_ref(
                    ex("Review"),
                    vec![ChildStep::new(ex("rating"))],
                )],
                parameters: BTreeMap::new(),
                parent: Some("t2".to_string()),
            },
        ],
    }
}

fn generate<'a>(
    alignment: &'a Alignment,
    target: &'a SchemaSpace,
    source: &'a SchemaSpace,
) -> (MappingGenerator<'a>, Report) {
    let mut generator = MappingGenerator::new(alignment, target)
        .with_source_space(source)
        .with_dialect(Dialect::DocumentStore);
    let mut report = Report::new();
    generator.generate(&mut report).unwrap();
    (generator, report)
}

#[test]
fn collection_mapping_uses_root_key_and_json_select() {
    let alignment = alignment();
    let target = target_space();
    let source = source_space();
    let (generator, report) = generate(&alignment, &target, &source);
    assert!(report.is_empty());

    let main = generator.main_mapping().unwrap();
    assert_eq!(main.type_mappings.len(), 1);
    let parcel = &main.type_mappings[0];
    assert_eq!(parcel.target_element, "ex:Parcel");
    // the logical collection name survives as the source type
    assert_eq!(parcel.source_type.as_deref(), Some("parcels"));
    assert_eq!(parcel.mapping_name.as_deref(), Some("parcels-Parcel"));

    let area = parcel
        .attribute_mappings
        .iter()
        .find(|a| a.target_attribute.as_deref() == Some("ex:area"))
        .expect("area attribute");
    assert_eq!(
        area.source_expression.as_ref().unwrap().ocql.as_deref(),
        Some("jsonSelect('area')")
    );
}

#[test]
fn collection_link_produces_nested_mapping_pair() {
    let alignment = alignment();
    let target = target_space();
    let source = source_space();
    let (generator, _) = generate(&alignment, &target, &source);

    assert!(generator.requires_multiple_files().unwrap());
    let main = generator.main_mapping().unwrap();
    let parcel = &main.type_mappings[0];

    let link = parcel
        .attribute_mappings
        .iter()
        .find(|a| a.target_attribute.as_deref() == Some("ex:review"))
        .expect("container link attribute");
    assert!(link.is_multiple);
    let source_expression = link.source_expression.as_ref().unwrap();
    assert_eq!(
        source_expression.ocql.as_deref(),
        Some("collectionLink('reviews')")
    );
    assert_eq!(
        source_expression.link_element.as_deref(),
        Some("'parcels-Review'")
    );
    assert_eq!(source_expression.link_field.as_deref(), Some("FEATURE_LINK[1]"));

    let included = generator.included_types_mapping().unwrap().unwrap();
    assert_eq!(included.type_mappings.len(), 1);
    let review = &included.type_mappings[0];
    assert_eq!(review.target_element, "ex:Review");
    assert_eq!(review.mapping_name.as_deref(), Some("parcels-Review"));
    assert_eq!(review.source_type.as_deref(), Some("parcels"));

    let counterpart = review
        .attribute_mappings
        .iter()
        .find(|a| a.target_attribute.as_deref() == Some("FEATURE_LINK[1]"))
        .expect("nested link attribute");
    assert_eq!(
        counterpart.source_expression.as_ref().unwrap().ocql.as_deref(),
        Some("nestedCollectionLink()")
    );

    let identifier = review
        .attribute_mappings
        .iter()
        .find(|a| a.id_expression.is_some())
        .expect("nested id attribute");
    assert_eq!(
        identifier.id_expression.as_ref().unwrap().ocql.as_deref(),
        Some("collectionId()")
    );

    // the nested collection's own property cell lands on the nested mapping
    let rating = review
        .attribute_mappings
        .iter()
        .find(|a| a.target_attribute.as_deref() == Some("ex:rating"))
        .expect("rating attribute");
    assert_eq!(
        rating.source_expression.as_ref().unwrap().ocql.as_deref(),
        Some("jsonSelect('rating')")
    );
}

#[test]
fn deployment_plan_uses_collection_name() {
    let alignment = alignment();
    let target = target_space();
    let source = source_space();
    let (generator, _) = generate(&alignment, &target, &source);

    let plan = generator.deployment_plan().unwrap();
    assert_eq!(plan.datastore.name, "parcels");
    assert_eq!(plan.datastore.id, "parcels_datastore");
    assert_eq!(
        plan.datastore.connection_parameters.get("mappingFileName"),
        Some(&"parcels.xml".to_string())
    );
    assert_eq!(plan.workspace.id, "ex_workspace");
    assert_eq!(plan.feature_types[0].id, "Parcel_featureType");
    assert_eq!(plan.layers[0].id, "Parcel_layer");
}

#[test]
fn serialized_output_references_included_types() {
    let alignment = alignment();
    let target = target_space();
    let source = source_space();
    let (generator, _) = generate(&alignment, &target, &source);

    let main = xml::write_document_to_string(generator.main_mapping().unwrap()).unwrap();
    assert!(main.contains("<Include>includedTypes.xml</Include>"));
    assert!(main.contains("<targetElement>ex:Parcel</targetElement>"));
    assert!(!main.contains("<targetElement>ex:Review</targetElement>"));

    let mut included_buffer = Vec::new();
    generator
        .write_included_types_mapping(&mut included_buffer)
        .unwrap();
    let included = String::from_utf8(included_buffer).unwrap();
    assert!(included.contains("<targetElement>ex:Review</targetElement>"));
    assert!(!included.contains("<Include>"));
}
