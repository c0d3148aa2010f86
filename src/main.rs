//! @ai:module:intent CLI entry point for repository enrichment
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on enricher, config, walker, output

use clap::{Args, Parser, Subcommand, ValueEnum};
use repodoc_enricher::{enricher, output, EnrichConfig, FileFilter, OutputFormat, Phase, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repodoc")]
#[command(author, version, about = "Synthesize and remove REST operation annotations on repository sources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log every decision at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach operation annotations to every exported repository
    Add(RunArgs),

    /// Strip the operation annotations a previous add attached
    Remove(RunArgs),

    /// Show how one file would be treated, without writing anything
    Inspect {
        /// Path to a repository source file
        path: PathBuf,

        /// TOML file with policy tables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Source file or directory to process
    source: PathBuf,

    /// Comma-separated include globs, relative to the source
    #[arg(long, value_delimiter = ',')]
    includes: Vec<String>,

    /// Comma-separated exclude globs; a matching directory is skipped entirely
    #[arg(long, value_delimiter = ',')]
    excludes: Vec<String>,

    /// Never synthesize PUT operations
    #[arg(long, default_value = "false")]
    no_put: bool,

    /// Method-level export directive annotation
    #[arg(long)]
    method_directive: Option<String>,

    /// Type-level export directive annotation
    #[arg(long)]
    repository_directive: Option<String>,

    /// TOML file with policy tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("repodoc=debug,repodoc_enricher=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("repodoc=info,repodoc_enricher=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// @ai:intent Load the policy tables, then apply command-line overrides
/// @ai:post the finder and remover patterns are known to compile
/// @ai:effects fs:read
fn load_config(path: Option<&Path>) -> Result<EnrichConfig> {
    let config = match path {
        Some(path) => EnrichConfig::load(path)?,
        None => EnrichConfig::default(),
    };
    config.method_patterns()?;
    Ok(config)
}

fn run(args: RunArgs, phase: Phase) -> ExitCode {
    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    if args.no_put {
        config.policy.suppress_put = true;
    }
    if let Some(name) = args.method_directive {
        config.directives.method = name;
    }
    if let Some(name) = args.repository_directive {
        config.directives.repository = name;
    }

    let filter = match FileFilter::new(&args.includes, &args.excludes) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    match enricher::enrich_directory(&args.source, &filter, &config, phase) {
        Ok(report) => {
            println!("{}", output::format_report(&report, args.format.into()));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Add(args) => run(args, Phase::Add),
        Commands::Remove(args) => run(args, Phase::Remove),
        Commands::Inspect {
            path,
            config,
            format,
        } => {
            let inspection = load_config(config.as_deref())
                .and_then(|config| enricher::inspect_file(&path, &config));
            match inspection {
                Ok(inspection) => {
                    println!("{}", output::format_inspection(&inspection, format.into()));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::from(2)
                }
            }
        }
    }
}
