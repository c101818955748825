//! Alignmap CLI - generate mapping configurations from schema alignments

mod cli;
mod error;
mod logging;

use alignmap_core::{
    model, Alignment, DataStoreConfig, FeatureChaining, MappingDocument, MappingGenerator,
    Report, SchemaSpace, Severity, WorkspaceConfiguration, INCLUDED_TYPES_FILE,
};
use cli::{Cli, Commands, GenerateArgs};
use colored::Colorize;
use error::{Error, Result};
use std::fs::{self, File};
use std::path::Path;
use std::process;

fn main() {
    let cli = Cli::parse_args();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logging::init(cli.verbose);

    if let Err(error) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), error);
        process::exit(error.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Plan(args) => plan(args),
    }
}

/// All run inputs, loaded from their JSON files.
struct Inputs {
    alignment: Alignment,
    target: SchemaSpace,
    source: Option<SchemaSpace>,
    datastore: Option<DataStoreConfig>,
    chaining: Option<FeatureChaining>,
    workspaces: Option<WorkspaceConfiguration>,
    template: Option<MappingDocument>,
}

impl Inputs {
    fn load(args: &GenerateArgs) -> Result<Self> {
        let template = match args.template.as_deref() {
            Some(path) => Some(model::from_json_file(path).map_err(|e| {
                alignmap_core::Error::Template {
                    message: format!("failed to load template {}", path.display()),
                    source: Some(anyhow::Error::new(e)),
                }
            })?),
            None => None,
        };
        Ok(Self {
            alignment: model::from_json_file(&args.alignment)?,
            target: model::from_json_file(&args.target_schema)?,
            source: load_optional(args.source_schema.as_deref())?,
            datastore: load_optional(args.datastore.as_deref())?,
            chaining: load_optional(args.chaining.as_deref())?,
            workspaces: load_optional(args.workspaces.as_deref())?,
            template,
        })
    }

    fn generator(&self, args: &GenerateArgs) -> MappingGenerator<'_> {
        let mut generator = MappingGenerator::new(&self.alignment, &self.target)
            .with_dialect(args.dialect.into());
        if let Some(source) = &self.source {
            generator = generator.with_source_space(source);
        }
        if let Some(datastore) = &self.datastore {
            generator = generator.with_datastore(datastore);
        }
        if let Some(chaining) = &self.chaining {
            generator = generator.with_chaining(chaining);
        }
        if let Some(workspaces) = &self.workspaces {
            generator = generator.with_workspaces(workspaces);
        }
        if let Some(template) = &self.template {
            generator = generator.with_template(template.clone());
        }
        generator
    }
}

fn load_optional<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> Result<Option<T>> {
    match path {
        Some(path) => Ok(Some(model::from_json_file(path)?)),
        None => Ok(None),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let inputs = Inputs::load(&args)?;
    let mut generator = inputs.generator(&args);
    let mut report = Report::new();
    generator.generate(&mut report)?;
    tracing::info!(
        type_mappings = generator.main_mapping()?.type_mappings.len(),
        warnings = report.warning_count(),
        "mapping generated"
    );

    let deployment = generator.deployment_plan()?;
    fs::create_dir_all(&args.output_dir).map_err(|e| {
        Error::io(
            format!("failed to create {}", args.output_dir.display()),
            e,
        )
    })?;

    let main_path = args
        .output_dir
        .join(format!("{}.xml", deployment.datastore.name));
    let main_file = File::create(&main_path)
        .map_err(|e| Error::io(format!("failed to create {}", main_path.display()), e))?;
    generator.write_mapping(main_file)?;
    println!("{} {}", "wrote".green(), main_path.display());

    if generator.requires_multiple_files()? {
        let included_path = args.output_dir.join(INCLUDED_TYPES_FILE);
        let included_file = File::create(&included_path).map_err(|e| {
            Error::io(format!("failed to create {}", included_path.display()), e)
        })?;
        generator.write_included_types_mapping(included_file)?;
        println!("{} {}", "wrote".green(), included_path.display());
    }

    print_report(&report);
    Ok(())
}

fn plan(args: GenerateArgs) -> Result<()> {
    let inputs = Inputs::load(&args)?;
    let mut generator = inputs.generator(&args);
    let mut report = Report::new();
    generator.generate(&mut report)?;

    let deployment = generator.deployment_plan()?;
    let rendered = serde_json::to_string_pretty(&deployment).map_err(|e| Error::Json {
        message: "failed to render deployment plan".to_string(),
        source: e,
    })?;
    println!("{}", rendered);

    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    for entry in report.entries() {
        let severity = match entry.severity {
            Severity::Info => "info".dimmed(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Error => "error".red().bold(),
        };
        match &entry.cause {
            Some(cause) => eprintln!("{}: {}: {}", severity, entry.message, cause),
            None => eprintln!("{}: {}", severity, entry.message),
        }
    }
}
