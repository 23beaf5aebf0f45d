//! OpenDocument text exporter

use std::io::Cursor;
use std::path::PathBuf;

use tracing::debug;

use super::odf::{OdfContentWriter, OdfKind, OdfMetadata, build_package, walk_post_order};
use super::{ExportError, ReportExporter, rows_of, scalar_of};
use crate::engine::GenerationContext;

pub const ODT_FORMAT: &str = "odt";

/// Writes scalar values as paragraphs and row producers as tables, visiting
/// children before their parents
#[derive(Debug, Clone, Default)]
pub struct OdtReportExporter {
    temp_dir: Option<PathBuf>,
}

impl OdtReportExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage packages in `dir` instead of the OS temp dir
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }
}

impl ReportExporter for OdtReportExporter {
    fn format(&self) -> &str {
        ODT_FORMAT
    }

    fn file_extension(&self) -> &str {
        "odt"
    }

    fn mime_type(&self) -> &str {
        OdfKind::Text.mime_type()
    }

    fn export(&self, context: &GenerationContext<'_>) -> Result<Cursor<Vec<u8>>, ExportError> {
        let mut content = OdfContentWriter::new(OdfKind::Text)?;
        let mut tables = 0usize;

        if let Some(root) = context.detail_root() {
            walk_post_order(root, 0, &mut |element, _level| {
                if let Some(value) = scalar_of(element) {
                    content.paragraph(value.as_deref().unwrap_or_default())?;
                } else if let Some(table) = rows_of(element).filter(|t| !t.rows.is_empty()) {
                    tables += 1;
                    content.table(&table.name, table, false)?;
                }
                Ok(())
            })?;
        }

        let description = &context.template.description;
        let metadata = OdfMetadata {
            title: description.name.clone(),
            creator: description.author.clone(),
        };
        let package = build_package(
            OdfKind::Text,
            &content.finish()?,
            &metadata,
            self.temp_dir.as_deref(),
        )?;

        debug!(tables, bytes = package.len(), "Exported ODT");
        Ok(Cursor::new(package))
    }
}
