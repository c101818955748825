//! Command-line argument definitions

use alignmap_core::Dialect;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Translate schema alignments into mapping configurations.
#[derive(Debug, Parser)]
#[command(name = "alignmap", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate the mapping configuration file(s) from an alignment
    Generate(GenerateArgs),
    /// Print the deployment plan derived from the generated mapping
    Plan(GenerateArgs),
}

/// Inputs of one generation run. All files are JSON documents.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Alignment file (cells)
    #[arg(long)]
    pub alignment: PathBuf,

    /// Target schema space file
    #[arg(long)]
    pub target_schema: PathBuf,

    /// Source schema space file (display names, document path tags)
    #[arg(long)]
    pub source_schema: Option<PathBuf>,

    /// Datastore connection configuration file
    #[arg(long)]
    pub datastore: Option<PathBuf>,

    /// Feature chaining configuration file
    #[arg(long)]
    pub chaining: Option<PathBuf>,

    /// Workspace configuration file
    #[arg(long)]
    pub workspaces: Option<PathBuf>,

    /// Base mapping document template file
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Source dialect
    #[arg(long, value_enum, default_value = "relational")]
    pub dialect: DialectArg,

    /// Directory the mapping file(s) are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Relational,
    DocumentStore,
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Relational => Dialect::Relational,
            DialectArg::DocumentStore => Dialect::DocumentStore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "alignmap",
            "generate",
            "--alignment",
            "alignment.json",
            "--target-schema",
            "target.json",
            "--dialect",
            "document-store",
            "-o",
            "out",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.alignment, PathBuf::from("alignment.json"));
                assert_eq!(args.dialect, DialectArg::DocumentStore);
                assert_eq!(args.output_dir, PathBuf::from("out"));
            }
            _ => panic!("expected generate command"),
        }
    }

    #[test]
    fn test_missing_required_arguments() {
        assert!(Cli::try_parse_from(["alignmap", "generate"]).is_err());
    }
}
