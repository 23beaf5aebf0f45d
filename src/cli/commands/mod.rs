//! CLI command implementations

pub mod formats;
pub mod generate;
pub mod validate;

use std::path::Path;

use tracing::warn;

use crate::cli::error::CliError;
use crate::template::{ReportTemplate, ReportTemplateFactory};

/// Load a template, logging serializer warnings
pub fn load_template(path: &Path) -> Result<(ReportTemplate, Vec<String>), CliError> {
    let mut factory = ReportTemplateFactory::new();
    let template = factory.load_from_path(path)?;
    let warnings = factory.warnings().to_vec();
    for warning in &warnings {
        warn!(template = %path.display(), "{warning}");
    }
    Ok((template, warnings))
}
