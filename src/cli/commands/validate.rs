//! Validate command implementation

use std::path::Path;

use super::load_template;
use crate::cli::error::CliError;
use crate::cli::output::format_template_summary;

/// Handle the validate command, returning the number of warnings
pub fn handle_validate(template: &Path) -> Result<usize, CliError> {
    let (template, warnings) = load_template(template)?;
    print!("{}", format_template_summary(&template, &warnings));
    Ok(warnings.len())
}
