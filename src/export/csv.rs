//! CSV exporter
//!
//! Only the first table of the layout is written: a header row followed by
//! the data rows. Nothing is written when that table has no rows.

use std::io::Cursor;

use tracing::debug;

use super::{ExportError, ReportExporter, find_first_multiple_rows_producer, rows_of};
use crate::engine::GenerationContext;

pub const CSV_FORMAT: &str = "csv";

#[derive(Debug, Clone)]
pub struct CsvReportExporter {
    delimiter: u8,
    include_header: bool,
}

impl Default for CsvReportExporter {
    fn default() -> Self {
        Self {
            delimiter: b';',
            include_header: true,
        }
    }
}

impl CsvReportExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }
}

impl ReportExporter for CsvReportExporter {
    fn format(&self) -> &str {
        CSV_FORMAT
    }

    fn file_extension(&self) -> &str {
        "csv"
    }

    fn mime_type(&self) -> &str {
        "text/csv"
    }

    fn export(&self, context: &GenerationContext<'_>) -> Result<Cursor<Vec<u8>>, ExportError> {
        let table = context
            .detail_root()
            .and_then(find_first_multiple_rows_producer)
            .and_then(rows_of);

        let Some(table) = table.filter(|t| !t.rows.is_empty()) else {
            debug!("No rows to export as CSV");
            return Ok(Cursor::new(Vec::new()));
        };

        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(::csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        if self.include_header {
            writer.write_record(table.column_names())?;
        }
        for row in &table.rows {
            writer.write_record(row.texts())?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Csv(e.to_string()))?;
        debug!(table = %table.name, rows = table.rows.len(), bytes = bytes.len(), "Exported CSV");
        Ok(Cursor::new(bytes))
    }
}
