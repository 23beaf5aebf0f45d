//! Generate command implementation

use std::path::{Path, PathBuf};

use tracing::info;

use super::load_template;
use crate::cli::error::CliError;
use crate::cli::output::format_generation_summary;
use crate::engine::{EngineConfig, GenerationReport, ReportEngine};
use crate::export::ReportExporter;

/// Arguments of the generate command
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub template: PathBuf,
    /// Exporter key; the configured default when unset
    pub format: Option<String>,
    /// Output file; the template path with the exporter's extension when unset
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Handle the generate command
pub fn handle_generate(args: &GenerateArgs) -> Result<(PathBuf, GenerationReport), CliError> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = ReportEngine::with_config(config)?;

    let format = args
        .format
        .clone()
        .unwrap_or_else(|| engine.config().default_format.clone());
    let exporter = engine.exporters().create(&format).ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "Unknown format '{format}' (available: {})",
            engine.exporters().formats().collect::<Vec<_>>().join(", ")
        ))
    })?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.template, exporter.file_extension()));

    let (mut template, _warnings) = load_template(&args.template)?;
    let exporter: &dyn ReportExporter = exporter.as_ref();
    let generated = engine.generate_with_report(&mut template, exporter)?;

    std::fs::write(&output, generated.content.get_ref())
        .map_err(|e| CliError::FileWriteError(output.clone(), e.to_string()))?;
    info!(output = %output.display(), bytes = generated.report.output_bytes, "Report written");

    Ok((output, generated.report))
}

/// Print the result of a generation
pub fn print_generation(output: &Path, report: &GenerationReport) {
    print!("{}", format_generation_summary(report, output));
}

fn default_output_path(template: &Path, extension: &str) -> PathBuf {
    template.with_extension(extension)
}
