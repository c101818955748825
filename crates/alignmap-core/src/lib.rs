//! Alignmap Core - Mapping generation engine for schema alignments
//!
//! This crate translates a declarative schema alignment (type- and
//! property-level transformation rules mapping a source data model to a
//! target XML schema) into a structured mapping configuration consumable by
//! a downstream feature-serving engine.
//!
//! # Main Components
//!
//! - **Error Handling**: Error types using `thiserror` and `anyhow`
//! - **Input Model**: Alignments, schemas, chaining and run configuration
//! - **Mapping Store**: Content-addressed output-model builder with
//!   main/included-file partitioning
//! - **Generator**: The orchestrator walking the alignment and dispatching
//!   per-transformation handlers
//! - **Deployment**: Derived workspace/datastore/layer descriptors
//!
//! # Example
//!
//! ```no_run
//! use alignmap_core::{generate, Alignment, SchemaSpace};
//!
//! fn example(alignment: &Alignment, target: &SchemaSpace) -> alignmap_core::Result<()> {
//!     let generation = generate(alignment, target)?;
//!     println!("{} type mappings", generation.main.type_mappings.len());
//!     Ok(())
//! }
//! ```

pub mod deploy;
pub mod error;
pub mod expression;
pub mod generator;
pub mod mapping;
pub mod model;
pub mod report;
pub mod xml;

// Re-export main types for convenience
pub use error::{Error, Result, Severity};
pub use model::{
    functions, Alignment, Cardinality, Cell, ChainConfiguration, ChildStep, DataStoreConfig,
    Entity, FeatureChaining, JoinCondition, JoinParameter, Name, ParameterValue, PathKind,
    PathTag, PropertyDefinition, Schema, SchemaSpace, TypeDefinition, TypeKind,
    WorkspaceConfiguration, WorkspaceSettings,
};
pub use mapping::{
    AttributeExpression, AttributeMapping, ClientProperty, DataStore, FeatureTypeMapping,
    MappingDocument, MappingStore, MultiValueJoin, Namespace, Parameter,
    INCLUDED_TYPES_FILE,
};
pub use generator::{Dialect, GenerationMetadata, MappingGenerator};
pub use deploy::DeploymentPlan;
pub use report::{Report, ReportEntry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result of a convenience [`generate`] call.
#[derive(Debug, Clone)]
pub struct Generation {
    pub main: MappingDocument,
    pub included_types: Option<MappingDocument>,
    pub report: Report,
    pub metadata: Option<GenerationMetadata>,
}

/// Generate a mapping configuration with default settings (relational
/// dialect, no datastore/chaining/workspace configuration).
pub fn generate(alignment: &Alignment, target_space: &SchemaSpace) -> Result<Generation> {
    let mut generator = MappingGenerator::new(alignment, target_space);
    let mut report = Report::new();
    generator.generate(&mut report)?;

    Ok(Generation {
        main: generator.main_mapping()?.clone(),
        included_types: generator.included_types_mapping()?.cloned(),
        metadata: generator.metadata().cloned(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_generate_empty_alignment() {
        let alignment = Alignment::default();
        let target = SchemaSpace::default();
        let generation = generate(&alignment, &target).unwrap();
        assert!(generation.main.type_mappings.is_empty());
        assert!(generation.included_types.is_none());
        assert!(generation.report.is_empty());
    }
}
