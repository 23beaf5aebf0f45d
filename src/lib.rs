//! Report Composer - declarative report templates bound to data sources
//!
//! Provides:
//! - A template object model: a tree of composition elements per section
//! - Data sources backed by static, database and script providers
//! - A preparation pass binding retrieved data onto table elements
//! - A generation engine driving sources, preparation and export
//! - CSV, XHTML, ODT and ODS exporters
//! - XML template serialization

#[cfg(feature = "cli")]
pub mod cli;
pub mod data;
pub mod engine;
pub mod export;
pub mod models;
pub mod scripting;
pub mod serialization;
pub mod template;
pub mod xml;

// Re-export commonly used types
pub use data::{DataError, DataProvider, DataSource, DataSourceCollection};
pub use engine::{
    EngineConfig, GenerationContext, GenerationReport, GenerationState, ReportEngine,
    ReportGenerationError,
};
pub use export::{ExportError, ExporterRegistry, ReportExporter};
pub use models::{DataSet, DataTable, PropertyContainer};
pub use scripting::{ExtensionCollection, ScriptingProvider};
pub use serialization::{SerializationError, TemplateSerializer, XmlTemplateSerializer};
pub use template::{ReportTemplate, ReportTemplateFactory};
