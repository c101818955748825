//! Mapping generator: the orchestrator of one generation run
//!
//! Drives the two-pass walk over the alignment (namespace collection, then
//! type/property mapping), owns error collection, and exposes the finished
//! documents for downstream packaging.
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

pub mod context;
pub mod properties;
pub mod types;

pub use context::{Dialect, MappingContext};

use crate::deploy::{self, DeploymentPlan};
use crate::error::{Error, Result};
use crate::mapping::{MappingDocument, MappingStore, XLINK_URI};
use crate::model::{
    functions, Alignment, Cell, DataStoreConfig, Entity, FeatureChaining, SchemaSpace,
    WorkspaceConfiguration,
};
use crate::report::Report;
use crate::xml;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Instant;
use tracing::{debug, warn};

/// Metadata about one finished generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub timestamp: String,
    pub duration_ms: u64,
    pub dialect: Dialect,
}

/// Translates a schema alignment into a mapping configuration.
///
/// The generator is not reentrant: a second `generate()` call resets all
/// internal caches first, and a fatal error resets them before propagating,
/// so a retried call starts clean.
pub struct MappingGenerator<'a> {
    alignment: &'a Alignment,
    target_space: &'a SchemaSpace,
    source_space: Option<&'a SchemaSpace>,
    datastore: Option<&'a DataStoreConfig>,
    chaining: Option<&'a FeatureChaining>,
    workspaces: Option<&'a WorkspaceConfiguration>,
    template: Option<MappingDocument>,
    dialect: Dialect,
    store: Option<MappingStore>,
    main: Option<MappingDocument>,
    included: Option<MappingDocument>,
    metadata: Option<GenerationMetadata>,
}

impl<'a> MappingGenerator<'a> {
    pub fn new(alignment: &'a Alignment, target_space: &'a SchemaSpace) -> Self {
        Self {
            alignment,
            target_space,
            source_space: None,
            datastore: None,
            chaining: None,
            workspaces: None,
            template: None,
            dialect: Dialect::Relational,
            store: None,
            main: None,
            included: None,
            metadata: None,
        }
    }

    /// Source schema (display names and document path tags of source
    /// types).
    pub fn with_source_space(mut self, source_space: &'a SchemaSpace) -> Self {
        self.source_space = Some(source_space);
        self
    }

    pub fn with_datastore(mut self, datastore: &'a DataStoreConfig) -> Self {
        self.datastore = Some(datastore);
        self
    }

    pub fn with_chaining(mut self, chaining: &'a FeatureChaining) -> Self {
        self.chaining = Some(chaining);
        self
    }

    pub fn with_workspaces(mut self, workspaces: &'a WorkspaceConfiguration) -> Self {
        self.workspaces = Some(workspaces);
        self
    }

    /// Base document template: datastores, schema URIs and includes are
    /// carried into the generated documents.
    pub fn with_template(mut self, template: MappingDocument) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Run the full generation. On success the finished documents are
    /// available through the accessors; non-fatal conditions land in
    /// `report`.
    pub fn generate(&mut self, report: &mut Report) -> Result<()> {
        self.reset_state();
        match self.run(report) {
            Ok(()) => Ok(()),
            Err(error) => {
                // make sure state is reset so a retried call starts clean
                self.reset_state();
                Err(error)
            }
        }
    }

    fn reset_state(&mut self) {
        self.store = None;
        self.main = None;
        self.included = None;
        self.metadata = None;
    }

    fn run(&mut self, report: &mut Report) -> Result<()> {
        let started = Instant::now();

        let store = match &self.template {
            Some(template) => {
                MappingStore::from_template(template, self.dialect.permissive_attribute_keys())
            }
            None => MappingStore::new(self.dialect.permissive_attribute_keys()),
        };
        let mut context = MappingContext::new(
            store,
            self.alignment,
            self.target_space,
            self.source_space,
            self.chaining.cloned(),
            self.workspaces,
            self.dialect,
        );

        if self.dialect == Dialect::DocumentStore {
            let prefix = self.document_mapping_prefix()?;
            context.store.set_mapping_prefix(prefix);
        }

        // the namespace pass must complete before the mapping pass: prefixes
        // referenced during path construction are assumed registered
        self.create_namespaces(&mut context);

        if let Some(datastore) = self.datastore {
            context.store.merge_datastore_config(datastore);
        }

        for schema in &self.target_space.schemas {
            context.store.add_schema_uri(schema.location.clone());
        }

        self.create_type_mappings(&mut context, report)?;

        self.main = Some(context.store.main_mapping());
        self.included = context.store.included_types_mapping();
        self.store = Some(context.store);
        self.metadata = Some(GenerationMetadata {
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration_ms: started.elapsed().as_millis() as u64,
            dialect: self.dialect,
        });

        Ok(())
    }

    /// The collection name prefixed to every mapping name of a
    /// document-store run, read off the first type cell's source.
    fn document_mapping_prefix(&self) -> Result<String> {
        let cell = self
            .alignment
            .type_cells()
            .next()
            .ok_or_else(|| Error::InvalidState {
                message: "alignment contains no type cells".to_string(),
            })?;
        let source = cell
            .first_source()
            .ok_or_else(|| Error::invalid_cell(&cell.id, "no source type has been specified"))?;
        self.source_space
            .and_then(|space| space.type_by_name(&source.type_name))
            .and_then(|definition| definition.path_tag.as_ref())
            .map(|tag| tag.root_key.clone())
            .ok_or_else(|| {
                Error::invalid_cell(&cell.id, "source type carries no document path tag")
            })
    }

    /// Namespace-collection pass: every target entity of every cell,
    /// including all property-path steps.
    fn create_namespaces(&self, context: &mut MappingContext) {
        for type_cell in self.alignment.type_cells() {
            for entity in &type_cell.target {
                self.namespaces_for_entity(context, entity);
            }
            for property_cell in self.alignment.property_cells(type_cell) {
                for entity in &property_cell.target {
                    self.namespaces_for_entity(context, entity);
                }
            }
        }
    }

    fn namespaces_for_entity(&self, context: &mut MappingContext, entity: &Entity) {
        let type_name = &entity.type_name;
        context.get_or_create_namespace(&type_name.namespace, &type_name.prefix);

        match context.resolve_target_entity(entity) {
            Ok((_, path)) => {
                for step in &path {
                    if step.property.group {
                        continue;
                    }
                    let name = &step.property.name;
                    // a step without a prefix borrows the declaring type's
                    // prefix when both live in the same namespace
                    let prefix = if name.prefix.is_empty()
                        && step.parent_type.namespace == name.namespace
                    {
                        step.parent_type.prefix.clone()
                    } else {
                        name.prefix.clone()
                    };
                    context.get_or_create_namespace(&name.namespace, &prefix);
                }
            }
            Err(error) => {
                debug!(%error, "falling back to raw path steps for namespace collection");
                for step in &entity.path {
                    context.get_or_create_namespace(&step.name.namespace, &step.name.prefix);
                }
            }
        }
    }

    /// Mapping pass: type cells in alignment order, property cells per
    /// type cell plus the cross-cutting `xlink:href` scan. Unsupported
    /// transformations are downgraded to report warnings.
    fn create_type_mappings(
        &self,
        context: &mut MappingContext,
        report: &mut Report,
    ) -> Result<()> {
        for type_cell in self.alignment.type_cells() {
            match types::handle_type_cell(type_cell, context) {
                Ok(_) => {}
                Err(error) if error.is_recoverable() => {
                    warn!(cell = %type_cell.id, %error, "skipping type cell");
                    report.warn(
                        format!("Error processing type cell '{}'", type_cell.id),
                        Some(error.to_string()),
                    );
                    continue;
                }
                Err(error) => return Err(error),
            }

            if self.dialect == Dialect::DocumentStore {
                types::tag_simple_source(type_cell, context)?;
            }

            for property_cell in self.property_cells_for(type_cell) {
                let outcome = if self.dialect == Dialect::DocumentStore
                    && property_cell.transformation == functions::COLLECTION_LINK
                {
                    types::handle_collection_link(property_cell, context).map(|_| ())
                } else {
                    properties::handle_property_cell(type_cell, property_cell, context)
                        .map(|_| ())
                };
                match outcome {
                    Ok(()) => {}
                    Err(error) if error.is_recoverable() => {
                        warn!(cell = %property_cell.id, %error, "skipping property cell");
                        report.warn(
                            format!("Error processing property cell '{}'", property_cell.id),
                            Some(error.to_string()),
                        );
                    }
                    Err(error) => return Err(error),
                }
            }
        }
        Ok(())
    }

    /// The property cells of a type cell, in alignment order, plus any
    /// cross-cutting cells targeting an `xlink:href` attribute of the same
    /// target type, gathered regardless of which type cell they were
    /// attached to.
    fn property_cells_for<'b>(&'b self, type_cell: &'b Cell) -> Vec<&'b Cell> {
        let mut cells: Vec<&Cell> = self.alignment.property_cells(type_cell).collect();

        if let Some(type_target) = type_cell.first_target() {
            for cell in self.alignment.cells() {
                if cell.is_type_cell() || cell.parent.as_deref() == Some(type_cell.id.as_str()) {
                    continue;
                }
                if !functions::is_href_compatible(&cell.transformation) {
                    continue;
                }
                let Some(target) = cell.first_target() else {
                    continue;
                };
                let is_href = target.last_step().map_or(false, |step| {
                    step.name.local == "href" && step.name.namespace == XLINK_URI
                });
                if is_href && target.type_name.matches(&type_target.type_name) {
                    cells.push(cell);
                }
            }
        }

        cells
    }

    fn generated(&self) -> Result<()> {
        if self.main.is_none() {
            return Err(Error::InvalidState {
                message: "no mapping has been generated yet".to_string(),
            });
        }
        Ok(())
    }

    /// The main output document.
    pub fn main_mapping(&self) -> Result<&MappingDocument> {
        self.generated()?;
        self.main.as_ref().ok_or_else(|| Error::InvalidState {
            message: "no mapping has been generated yet".to_string(),
        })
    }

    /// The included-types document, or `None` when a single file suffices.
    pub fn included_types_mapping(&self) -> Result<Option<&MappingDocument>> {
        self.generated()?;
        Ok(self.included.as_ref())
    }

    pub fn requires_multiple_files(&self) -> Result<bool> {
        self.generated()?;
        Ok(self.included.is_some())
    }

    pub fn metadata(&self) -> Option<&GenerationMetadata> {
        self.metadata.as_ref()
    }

    /// Rewrite a target schema reference (used by exporters that relocate
    /// the schema) and refresh the cached documents.
    pub fn update_schema_uri(&mut self, old_uri: &str, new_uri: &str) -> Result<()> {
        self.generated()?;
        let store = self.store.as_mut().ok_or_else(|| Error::InvalidState {
            message: "no mapping has been generated yet".to_string(),
        })?;
        store.update_schema_uri(old_uri, new_uri);
        self.main = Some(store.main_mapping());
        self.included = store.included_types_mapping();
        Ok(())
    }

    /// Serialize the main document to XML.
    pub fn write_mapping<W: Write>(&self, out: W) -> Result<()> {
        xml::write_document(self.main_mapping()?, out)
    }

    /// Serialize the included-types document to XML; an error when the
    /// generated mapping fits a single file.
    pub fn write_included_types_mapping<W: Write>(&self, out: W) -> Result<()> {
        match self.included_types_mapping()? {
            Some(document) => xml::write_document(document, out),
            None => Err(Error::InvalidState {
                message: "no included types configuration is available for the generated mapping"
                    .to_string(),
            }),
        }
    }

    /// Derive the deployment description (workspace, namespace, datastore,
    /// feature types, layers) from the finished mapping.
    pub fn deployment_plan(&self) -> Result<DeploymentPlan> {
        let main = self.main_mapping()?;
        let schema = self
            .target_space
            .primary_schema()
            .ok_or_else(|| Error::InvalidState {
                message: "target schema not available".to_string(),
            })?;
        deploy::derive_plan(main, schema, self.workspaces, self.dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChildStep, Name, PropertyDefinition, Schema, TypeDefinition, TypeKind};
    use std::collections::BTreeMap;

    fn ex(local: &str) -> Name {
        Name::with_prefix("http://example.com/ex", local, "ex")
    }

    fn target_space() -> SchemaSpace {
        let mut parcel = TypeDefinition::new(ex("Parcel"), TypeKind::Feature);
        parcel.children.push(PropertyDefinition::new(ex("area")));
        SchemaSpace::new(vec![Schema {
            location: "http://example.com/schemas/parcels.xsd".to_string(),
            namespace: "http://example.com/ex".to_string(),
            types: vec![parcel],
        }])
    }

    fn alignment() -> Alignment {
        Alignment {
            cells: vec![
                Cell {
                    id: "t1".to_string(),
                    transformation: functions::RETYPE.to_string(),
                    source: vec![Entity::type_ref(Name::local("Parcel"))],
                    target: vec![Entity::type_ref(ex("Parcel"))],
                    parameters: BTreeMap::new(),
                    parent: None,
                },
                Cell {
                    id: "p1".to_string(),
                    transformation: functions::RENAME.to_string(),
                    source: vec![Entity::property_ref(
                        Name::local("Parcel"),
                        vec![ChildStep::new(Name::local("area"))],
                    )],
                    target: vec![Entity::property_ref(
                        ex("Parcel"),
                        vec![ChildStep::new(ex("area"))],
                    )],
                    parameters: BTreeMap::new(),
                    parent: Some("t1".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_accessors_require_generation() {
        let alignment = alignment();
        let space = target_space();
        let generator = MappingGenerator::new(&alignment, &space);
        assert!(matches!(
            generator.main_mapping(),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_basic_generation() {
        let alignment = alignment();
        let space = target_space();
        let mut generator = MappingGenerator::new(&alignment, &space);
        let mut report = Report::new();
        generator.generate(&mut report).unwrap();

        let main = generator.main_mapping().unwrap();
        assert_eq!(main.type_mappings.len(), 1);
        assert_eq!(main.type_mappings[0].target_element, "ex:Parcel");
        assert_eq!(main.type_mappings[0].source_type.as_deref(), Some("Parcel"));
        assert_eq!(
            main.schema_uris,
            vec!["http://example.com/schemas/parcels.xsd".to_string()]
        );
        assert!(report.is_empty());
        assert!(!generator.requires_multiple_files().unwrap());
    }

    #[test]
    fn test_unsupported_type_cell_is_reported_and_skipped() {
        let mut alignment = alignment();
        alignment.cells[0].transformation = "pivot".to_string();
        let space = target_space();
        let mut generator = MappingGenerator::new(&alignment, &space);
        let mut report = Report::new();
        generator.generate(&mut report).unwrap();

        assert_eq!(report.warning_count(), 1);
        assert!(generator.main_mapping().unwrap().type_mappings.is_empty());
    }

    #[test]
    fn test_fatal_error_resets_state() {
        let mut alignment = alignment();
        alignment.cells[0].source.clear();
        let space = target_space();
        let mut generator = MappingGenerator::new(&alignment, &space);
        let mut report = Report::new();
        assert!(generator.generate(&mut report).is_err());
        assert!(generator.main_mapping().is_err());
    }

    #[test]
    fn test_update_schema_uri_refreshes_documents() {
        let alignment = alignment();
        let space = target_space();
        let mut generator = MappingGenerator::new(&alignment, &space);
        let mut report = Report::new();
        generator.generate(&mut report).unwrap();

        generator
            .update_schema_uri(
                "http://example.com/schemas/parcels.xsd",
                "./schemas/parcels.xsd",
            )
            .unwrap();
        assert_eq!(
            generator.main_mapping().unwrap().schema_uris,
            vec!["./schemas/parcels.xsd".to_string()]
        );
    }
}
