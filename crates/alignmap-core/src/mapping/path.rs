//! Attribute path construction
//!
//! Builds the XPath-like target attribute strings referenced by attribute
//! mappings, resolving namespace prefixes through the registry on the fly.

use super::namespaces::NamespaceRegistry;
use crate::model::{ResolvedStep, TypeDefinition};

/// Build the target attribute path for a property, relative to its owning
/// feature type.
///
/// The path is walked backward (leaf to root); structural groups contribute
/// no segment. Walking stops at the first step whose declaring type is the
/// owning type, which anchors the result below the feature type instead of
/// at the schema root. A repetition index on a step becomes a 1-based XPath
/// index.
pub fn attribute_xpath(
    registry: &mut NamespaceRegistry,
    owning_type: &TypeDefinition,
    path: &[ResolvedStep],
) -> String {
    let mut segments: Vec<String> = Vec::new();

    for step in path.iter().rev() {
        if !step.property.group {
            let mut segment = registry.qualified(&step.property.name);
            if let Some(context_id) = step.context_id {
                // XPath indices start from 1, context ids from 0
                segment = format!("{}[{}]", segment, context_id + 1);
            }
            segments.insert(0, segment);
        }
        if step.parent_type.matches(&owning_type.name) {
            // reached the owning type: stop walking the path
            break;
        }
    }

    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Name, PropertyDefinition, TypeKind};

    fn ex(local: &str) -> Name {
        Name::with_prefix("http://example.com/ex", local, "ex")
    }

    fn step(local: &str, parent: &str) -> ResolvedStep {
        ResolvedStep {
            property: PropertyDefinition::new(ex(local)),
            parent_type: ex(parent),
            context_id: None,
            condition: None,
        }
    }

    fn owning(local: &str) -> TypeDefinition {
        TypeDefinition::new(ex(local), TypeKind::Feature)
    }

    #[test]
    fn test_empty_path() {
        let mut registry = NamespaceRegistry::new();
        assert_eq!(attribute_xpath(&mut registry, &owning("Parcel"), &[]), "");
    }

    #[test]
    fn test_single_segment() {
        let mut registry = NamespaceRegistry::new();
        let path = vec![step("area", "Parcel")];
        assert_eq!(
            attribute_xpath(&mut registry, &owning("Parcel"), &path),
            "ex:area"
        );
    }

    #[test]
    fn test_anchoring_at_owning_type() {
        // mapping B.C under owning type B yields only the segment below B
        let mut registry = NamespaceRegistry::new();
        let path = vec![step("b", "A"), step("c", "B")];
        assert_eq!(
            attribute_xpath(&mut registry, &owning("B"), &path),
            "ex:c"
        );
    }

    #[test]
    fn test_groups_are_skipped() {
        let mut registry = NamespaceRegistry::new();
        let mut group = step("choice", "Parcel");
        group.property.group = true;
        let path = vec![group, step("zone", "ChoiceType")];
        assert_eq!(
            attribute_xpath(&mut registry, &owning("Parcel"), &path),
            "ex:zone"
        );
    }

    #[test]
    fn test_repetition_index_is_one_based() {
        let mut registry = NamespaceRegistry::new();
        let mut repeated = step("owner", "Parcel");
        repeated.context_id = Some(1);
        assert_eq!(
            attribute_xpath(&mut registry, &owning("Parcel"), &[repeated]),
            "ex:owner[2]"
        );
    }
}
