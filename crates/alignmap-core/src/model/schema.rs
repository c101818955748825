//! Target (and optionally source) schema model
//!
//! The engine only needs enough of the schema to classify types, resolve
//! property paths and read per-definition constraints; everything else about
//! schema loading lives outside the core.
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use super::alignment::ChildStep;
use super::Name;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// An enumerable set of schemas, typically the target schema space of one
/// generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSpace {
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

impl SchemaSpace {
    pub fn new(schemas: Vec<Schema>) -> Self {
        Self { schemas }
    }

    /// The schema from which interpolation variables (workspace, datastore
    /// name) are derived.
    pub fn primary_schema(&self) -> Option<&Schema> {
        self.schemas.first()
    }

    /// Look up a type definition by qualified name across all schemas.
    pub fn type_by_name(&self, name: &Name) -> Option<&TypeDefinition> {
        self.schemas
            .iter()
            .flat_map(|s| s.types.iter())
            .find(|t| t.name.matches(name))
    }

    /// All mapping-relevant types across all schemas.
    pub fn mapping_relevant_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.schemas.iter().flat_map(|s| s.types.iter())
    }

    /// Resolve a property path against its owning type, yielding one
    /// resolved step per path entry.
    pub fn resolve_path(
        &self,
        owning_type: &TypeDefinition,
        path: &[ChildStep],
    ) -> Result<Vec<ResolvedStep>> {
        let mut resolved = Vec::with_capacity(path.len());
        let mut current: Option<&TypeDefinition> = Some(owning_type);

        for step in path {
            let parent = current.ok_or_else(|| Error::SchemaLookup {
                message: format!(
                    "path step '{}' has no declaring type below '{}'",
                    step.name, owning_type.name
                ),
            })?;
            let child = parent.child(&step.name).ok_or_else(|| Error::SchemaLookup {
                message: format!("type '{}' has no child '{}'", parent.name, step.name),
            })?;

            resolved.push(ResolvedStep {
                property: child.clone(),
                parent_type: parent.name.clone(),
                context_id: step.context_id,
                condition: step.condition.clone(),
            });

            current = child
                .type_name
                .as_ref()
                .and_then(|name| self.type_by_name(name));
        }

        Ok(resolved)
    }
}

/// One schema: location, namespace and the subset of its types relevant to
/// mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub location: String,
    pub namespace: String,
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

impl Schema {
    /// The schema name used to derive datastore and mapping file names:
    /// the location's file stem, stripped of any fragment.
    pub fn name(&self) -> &str {
        let mut path = self.location.as_str();
        if let Some(idx) = path.find('#') {
            path = &path[..idx];
        }
        if let Some(idx) = path.rfind('/') {
            path = &path[idx + 1..];
        }
        if let Some(idx) = path.rfind('.') {
            path = &path[..idx];
        }
        path
    }
}

/// Classification of a target type, as far as the engine needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    /// A mappable feature type (top-level element).
    Feature,
    /// A complex non-feature type.
    #[default]
    Object,
    /// A geometry object type.
    Geometry,
    /// A remote reference type; never a valid mapping target by itself.
    Reference,
    /// An anonymous (unnamed, locally declared) type.
    Anonymous,
}

/// A type definition on the target (or source) schema side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: Name,
    /// Element display name; falls back to the local name.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub children: Vec<PropertyDefinition>,
    /// Document-store path annotation, if this type was inferred from
    /// sample documents.
    #[serde(default)]
    pub path_tag: Option<PathTag>,
}

impl TypeDefinition {
    pub fn new(name: Name, kind: TypeKind) -> Self {
        Self {
            name,
            display_name: None,
            kind,
            children: Vec::new(),
            path_tag: None,
        }
    }

    /// The element name used in `{prefix}:{name}` output positions.
    pub fn element_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name.local)
    }

    pub fn is_feature(&self) -> bool {
        self.kind == TypeKind::Feature
    }

    pub fn is_geometry(&self) -> bool {
        self.kind == TypeKind::Geometry
    }

    pub fn is_reference(&self) -> bool {
        self.kind == TypeKind::Reference
    }

    pub fn is_anonymous(&self) -> bool {
        self.kind == TypeKind::Anonymous
    }

    /// An anonymous type whose single child is an unbounded structural
    /// group. Only such types take part in multi-value sequence mapping.
    pub fn is_unbounded_sequence(&self) -> bool {
        self.is_anonymous()
            && self.children.len() == 1
            && self
                .children
                .first()
                .map(|c| c.group && c.cardinality.is_unbounded())
                .unwrap_or(false)
    }

    /// Find a declared child by name.
    pub fn child(&self, name: &Name) -> Option<&PropertyDefinition> {
        self.children.iter().find(|c| c.name.matches(name))
    }
}

/// Cardinality constraint. `max: None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    pub max: Option<u32>,
}

impl Default for Cardinality {
    fn default() -> Self {
        Self {
            min: 1,
            max: Some(1),
        }
    }
}

impl Cardinality {
    pub fn unbounded() -> Self {
        Self { min: 0, max: None }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// May the property occur more than once?
    pub fn is_multiple(&self) -> bool {
        self.max.map_or(true, |max| max > 1)
    }
}

/// A property (or structural group) declared by a type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: Name,
    /// The property's own type, resolvable in the schema space; `None` for
    /// simple leaf properties.
    #[serde(default)]
    pub type_name: Option<Name>,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Encoded as an XML attribute rather than an element.
    #[serde(default)]
    pub attribute: bool,
    #[serde(default)]
    pub nillable: bool,
    /// The designated identifier field of its parent type.
    #[serde(default)]
    pub identifier: bool,
    /// A structural group (sequence/choice), not a real property.
    #[serde(default)]
    pub group: bool,
    #[serde(default)]
    pub path_tag: Option<PathTag>,
}

impl PropertyDefinition {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            type_name: None,
            cardinality: Cardinality::default(),
            attribute: false,
            nillable: false,
            identifier: false,
            group: false,
            path_tag: None,
        }
    }

    /// Whether this property is the `nilReason` companion of a nillable
    /// element.
    pub fn is_nil_reason(&self) -> bool {
        self.name.local == "nilReason"
    }
}

/// Kind of a document-store path annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Simple,
    Complex,
    Collection,
}

/// Document-store source path annotation, produced by an external schema
/// inference step and consumed read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTag {
    /// The logical collection the definition was inferred from.
    pub root_key: String,
    pub key: String,
    pub path: String,
    pub kind: PathKind,
}

/// One resolved step of a property path: the declared child, its declaring
/// type and the path-level context.
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub property: PropertyDefinition,
    pub parent_type: Name,
    pub context_id: Option<u32>,
    pub condition: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(local: &str) -> Name {
        Name::with_prefix("http://example.com/ex", local, "ex")
    }

    fn parcel_type() -> TypeDefinition {
        let mut parcel = TypeDefinition::new(ex("Parcel"), TypeKind::Feature);
        parcel.children.push(PropertyDefinition::new(ex("area")));
        let mut owner = PropertyDefinition::new(ex("owner"));
        owner.type_name = Some(ex("OwnerType"));
        parcel.children.push(owner);
        parcel
    }

    fn owner_type() -> TypeDefinition {
        let mut owner = TypeDefinition::new(ex("OwnerType"), TypeKind::Object);
        owner.children.push(PropertyDefinition::new(ex("name")));
        owner
    }

    fn space() -> SchemaSpace {
        SchemaSpace::new(vec![Schema {
            location: "http://example.com/schemas/parcels.xsd".to_string(),
            namespace: "http://example.com/ex".to_string(),
            types: vec![parcel_type(), owner_type()],
        }])
    }

    #[test]
    fn test_schema_name() {
        let space = space();
        assert_eq!(space.primary_schema().unwrap().name(), "parcels");
    }

    #[test]
    fn test_resolve_nested_path() {
        let space = space();
        let parcel = space.type_by_name(&ex("Parcel")).unwrap();
        let path = vec![
            ChildStep::new(ex("owner")),
            ChildStep::new(ex("name")),
        ];
        let resolved = space.resolve_path(parcel, &path).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved[0].parent_type.matches(&ex("Parcel")));
        assert!(resolved[1].parent_type.matches(&ex("OwnerType")));
    }

    #[test]
    fn test_resolve_unknown_child() {
        let space = space();
        let parcel = space.type_by_name(&ex("Parcel")).unwrap();
        let path = vec![ChildStep::new(ex("bogus"))];
        assert!(space.resolve_path(parcel, &path).is_err());
    }

    #[test]
    fn test_unbounded_sequence_detection() {
        let mut anon = TypeDefinition::new(Name::local("AnonymousType"), TypeKind::Anonymous);
        let mut group = PropertyDefinition::new(Name::local("sequence"));
        group.group = true;
        group.cardinality = Cardinality::unbounded();
        anon.children.push(group);
        assert!(anon.is_unbounded_sequence());

        let plain = TypeDefinition::new(Name::local("AnonymousType"), TypeKind::Anonymous);
        assert!(!plain.is_unbounded_sequence());
    }

    #[test]
    fn test_cardinality() {
        assert!(!Cardinality::default().is_multiple());
        assert!(Cardinality::unbounded().is_multiple());
        assert!(Cardinality { min: 0, max: Some(3) }.is_multiple());
    }
}
