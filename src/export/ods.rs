//! OpenDocument spreadsheet exporter
//!
//! Writes only the first table of the layout, into a sheet named `Table`.

use std::io::Cursor;
use std::path::PathBuf;

use tracing::debug;

use super::odf::{OdfContentWriter, OdfKind, OdfMetadata, build_package};
use super::{ExportError, ReportExporter, find_first_multiple_rows_producer, rows_of};
use crate::engine::GenerationContext;
use crate::models::DataTable;

pub const ODS_FORMAT: &str = "ods";
const SHEET_NAME: &str = "Table";

#[derive(Debug, Clone, Default)]
pub struct OdsReportExporter {
    temp_dir: Option<PathBuf>,
}

impl OdsReportExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }
}

impl ReportExporter for OdsReportExporter {
    fn format(&self) -> &str {
        ODS_FORMAT
    }

    fn file_extension(&self) -> &str {
        "ods"
    }

    fn mime_type(&self) -> &str {
        OdfKind::Spreadsheet.mime_type()
    }

    fn export(&self, context: &GenerationContext<'_>) -> Result<Cursor<Vec<u8>>, ExportError> {
        let mut content = OdfContentWriter::new(OdfKind::Spreadsheet)?;

        let producer = context.detail_root().and_then(find_first_multiple_rows_producer);
        let mut rows = 0;
        if let Some(producer) = producer {
            match rows_of(producer).filter(|t| !t.rows.is_empty()) {
                Some(table) => {
                    rows = table.rows.len();
                    content.table(SHEET_NAME, table, true)?;
                }
                // A producer without rows still gets its (empty) sheet
                None => {
                    content.table(SHEET_NAME, &DataTable::new(SHEET_NAME), true)?;
                }
            }
        }

        let description = &context.template.description;
        let metadata = OdfMetadata {
            title: description.name.clone(),
            creator: description.author.clone(),
        };
        let package = build_package(
            OdfKind::Spreadsheet,
            &content.finish()?,
            &metadata,
            self.temp_dir.as_deref(),
        )?;

        debug!(rows, bytes = package.len(), "Exported ODS");
        Ok(Cursor::new(package))
    }
}
