//! Formats command implementation

use crate::cli::output::format_exporter_list;
use crate::engine::ReportEngine;

/// Handle the formats command
pub fn handle_formats(engine: &ReportEngine) {
    print!("{}", format_exporter_list(engine.exporters()));
}
