//! Report exporters
//!
//! An exporter renders a prepared template into bytes of one output format.
//! Exporters visit the Detail section's element tree and dispatch on the
//! capabilities each element exposes: scalar values become text, row
//! producers become tables, everything else becomes structure or decoration.

pub mod csv;
pub mod odf;
pub mod ods;
pub mod odt;
pub mod xhtml;

pub use self::csv::CsvReportExporter;
pub use ods::OdsReportExporter;
pub use odt::OdtReportExporter;
pub use xhtml::XhtmlReportExporter;

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use thiserror::Error;

use crate::engine::{ConfigError, EngineConfig, GenerationContext};
use crate::models::DataTable;
use crate::template::{ElementError, ElementRef};
use crate::xml::XmlError;

/// Errors raised while exporting a report
#[derive(Error, Debug)]
pub enum ExportError {
    /// Reading an element property failed
    #[error("Element error: {0}")]
    Element(#[from] ElementError),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("{0}")]
    Xml(#[from] XmlError),

    /// Building the document package failed
    #[error("Package error: {0}")]
    Package(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::csv::Error> for ExportError {
    fn from(err: ::csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Package(err.to_string())
    }
}

/// Renders prepared templates into one output format
pub trait ReportExporter: Send + Sync {
    /// Selection key, such as `csv`
    fn format(&self) -> &str;

    fn file_extension(&self) -> &str;

    fn mime_type(&self) -> &str;

    /// Render the prepared template of `context`
    fn export(&self, context: &GenerationContext<'_>) -> Result<Cursor<Vec<u8>>, ExportError>;
}

/// First element below (or at) `element` producing rows, in pre-order
pub fn find_first_multiple_rows_producer<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    if element.as_rows_producer().is_some() {
        return Some(element);
    }
    element
        .child_elements()
        .find_map(find_first_multiple_rows_producer)
}

/// Table rendered by a row-producing element
pub fn rows_of<'a>(element: ElementRef<'a>) -> Option<&'a DataTable> {
    element.as_rows_producer()?.table(element)
}

/// Value rendered by a scalar-producing element
pub fn scalar_of(element: ElementRef<'_>) -> Option<Option<String>> {
    element
        .as_scalar_producer()
        .map(|producer| producer.value(element))
}

pub type ExporterFactory = Arc<dyn Fn() -> Box<dyn ReportExporter> + Send + Sync>;

/// Maps format keys to exporter factories
#[derive(Clone, Default)]
pub struct ExporterRegistry {
    factories: BTreeMap<String, ExporterFactory>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in exporters configured by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let delimiter = u8::try_from(config.csv.delimiter).map_err(|_| {
            ConfigError::Invalid(format!("CSV delimiter {:?} is not ASCII", config.csv.delimiter))
        })?;
        let include_header = config.csv.include_header;
        let stylesheet = config.load_stylesheet()?;
        let title_fallback = config.xhtml.title_fallback.clone();
        let temp_dir = config.odf.temp_dir.clone();
        let ods_temp_dir = temp_dir.clone();

        let mut registry = Self::new();
        registry
            .register(csv::CSV_FORMAT, move || {
                Box::new(
                    CsvReportExporter::new()
                        .with_delimiter(delimiter)
                        .with_header(include_header),
                )
            })
            .register(xhtml::XHTML_FORMAT, move || {
                Box::new(
                    XhtmlReportExporter::new()
                        .with_stylesheet(stylesheet.clone())
                        .with_title_fallback(title_fallback.clone()),
                )
            })
            .register(odt::ODT_FORMAT, move || {
                Box::new(OdtReportExporter::new().with_temp_dir(temp_dir.clone()))
            })
            .register(ods::ODS_FORMAT, move || {
                Box::new(OdsReportExporter::new().with_temp_dir(ods_temp_dir.clone()))
            });
        Ok(registry)
    }

    pub fn register<F>(&mut self, format: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ReportExporter> + Send + Sync + 'static,
    {
        self.factories.insert(format.into(), Arc::new(factory));
        self
    }

    /// New exporter for `format`; keys compare case-insensitively
    pub fn create(&self, format: &str) -> Option<Box<dyn ReportExporter>> {
        let format = format.trim();
        self.factories
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(format))
            .map(|(_, factory)| factory())
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, format: &str) -> bool {
        let format = format.trim();
        self.factories.keys().any(|key| key.eq_ignore_ascii_case(format))
    }

    /// Registry with the built-in exporters and default settings
    pub fn default_builtin() -> Self {
        // The default configuration names no stylesheet, so nothing is read
        Self::from_config(&EngineConfig::default()).unwrap_or_default()
    }
}

impl std::fmt::Debug for ExporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ElementTree, VerticalContainerElement};

    #[test]
    fn test_find_first_rows_producer_pre_order() {
        let mut tree = ElementTree::new();
        let root = tree.insert(VerticalContainerElement);
        let nested = tree.add_container(root).unwrap();
        tree.add_label(nested, "x").unwrap();
        let first = tree.add_table(nested, "a", None).unwrap();
        tree.add_table(root, "b", None).unwrap();

        let found = find_first_multiple_rows_producer(tree.get(root).unwrap()).unwrap();
        assert_eq!(found.id(), first);
    }

    #[test]
    fn test_find_first_rows_producer_none() {
        let mut tree = ElementTree::new();
        let root = tree.insert(VerticalContainerElement);
        tree.add_label(root, "only text").unwrap();
        assert!(find_first_multiple_rows_producer(tree.get(root).unwrap()).is_none());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ExporterRegistry::default_builtin();
        assert_eq!(
            registry.formats().collect::<Vec<_>>(),
            vec!["csv", "ods", "odt", "xhtml"]
        );
        let exporter = registry.create("XHTML").unwrap();
        assert_eq!(exporter.format(), "xhtml");
        assert_eq!(exporter.file_extension(), "html");
        assert!(registry.create("pdf").is_none());
    }

    #[test]
    fn test_registry_rejects_missing_stylesheet() {
        let config = EngineConfig::default().with_stylesheet("/no/such/style.css");
        assert!(matches!(
            ExporterRegistry::from_config(&config),
            Err(ConfigError::Io { .. })
        ));
    }
}
