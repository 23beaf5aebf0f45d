//! CLI entry point for report-composer

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use report_composer::cli::CliError;
use report_composer::cli::commands::formats::handle_formats;
use report_composer::cli::commands::generate::{GenerateArgs, handle_generate, print_generation};
use report_composer::cli::commands::validate::handle_validate;
use report_composer::engine::{EngineConfig, ReportEngine};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "report-composer",
    version,
    about = "Generate reports from XML templates",
    long_about = "Generate CSV, XHTML, ODT and ODS reports from declarative XML templates.\n\n\
                  EXAMPLES:\n  \
                  report-composer generate --template sales.xml --format csv --output sales.csv\n  \
                  report-composer validate --template sales.xml\n  \
                  report-composer formats"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a report from a template
    Generate {
        /// Template XML file
        #[arg(short, long)]
        template: PathBuf,

        /// Output format key (csv, xhtml, odt, ods)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file; defaults to the template path with the format's extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Engine configuration TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse a template and report warnings
    Validate {
        /// Template XML file
        #[arg(short, long)]
        template: PathBuf,
    },

    /// List the available output formats
    Formats {
        /// Engine configuration TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber; `RUST_LOG` overrides the flags
fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Generate {
            template,
            format,
            output,
            config,
        } => {
            let args = GenerateArgs {
                template,
                format,
                output,
                config,
            };
            let (output, report) = handle_generate(&args)?;
            print_generation(&output, &report);
        }
        Command::Validate { template } => {
            let warnings = handle_validate(&template)?;
            debug!(warnings, "Validation finished");
        }
        Command::Formats { config } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };
            handle_formats(&ReportEngine::with_config(config)?);
        }
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
