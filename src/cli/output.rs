//! Output formatting for CLI

use std::path::Path;

use crate::engine::GenerationReport;
use crate::export::ExporterRegistry;
use crate::template::ReportTemplate;

/// Summary printed after a successful generation
pub fn format_generation_summary(report: &GenerationReport, output: &Path) -> String {
    format!(
        "✅ Wrote {} ({} bytes, format {}) in {}ms\n   run {} | {} data source(s), {} element(s) prepared\n",
        output.display(),
        report.output_bytes,
        report.format,
        report.duration_ms,
        report.run_id,
        report.data_sources,
        report.prepared_elements
    )
}

/// Template overview printed by `validate`
pub fn format_template_summary(template: &ReportTemplate, warnings: &[String]) -> String {
    let mut output = String::new();

    if !warnings.is_empty() {
        output.push_str("\n⚠️  Warnings:\n");
        for warning in warnings {
            output.push_str(&format!("  - {warning}\n"));
        }
    }

    let name = template.description.name.trim();
    output.push_str(&format!(
        "\nTemplate: {}\n",
        if name.is_empty() { "(unnamed)" } else { name }
    ));
    if !template.description.author.is_empty() {
        output.push_str(&format!("  Author: {}\n", template.description.author));
    }

    output.push_str(&format!("  Data sources: {}\n", template.data_sources.len()));
    for source in template.data_sources.iter() {
        output.push_str(&format!(
            "    - {} ({})\n",
            source.name,
            source.provider.type_key().unwrap_or("?")
        ));
    }

    for section in template.sections.iter() {
        output.push_str(&format!(
            "  Section {}: {} element(s)\n",
            section.section_type(),
            section.tree().len()
        ));
    }

    if warnings.is_empty() {
        output.push_str("\n✅ Template is valid\n");
    }
    output
}

/// Exporter listing printed by `formats`
pub fn format_exporter_list(registry: &ExporterRegistry) -> String {
    let mut output = String::from("Available formats:\n");
    for format in registry.formats() {
        if let Some(exporter) = registry.create(format) {
            output.push_str(&format!(
                "  {:<8} .{:<5} {}\n",
                format,
                exporter.file_extension(),
                exporter.mime_type()
            ));
        }
    }
    output
}
