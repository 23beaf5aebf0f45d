//! Report engine running generations through their state machine

use std::io::Cursor;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, info_span};
use uuid::Uuid;

use super::config::EngineConfig;
use super::context::GenerationContext;
use super::error::{ConfigError, DataSourceInitializeError, GenerationFault, ReportGenerationError};
use super::preparation::prepare_section;
use super::state::GenerationState;
use crate::data::{DataSource, DataSourceCollection, RetrievalContext};
use crate::export::{ExporterRegistry, ReportExporter};
use crate::scripting::ExtensionCollection;
use crate::template::ReportTemplate;

/// How the exporter for a generation is chosen
pub enum ExporterSelector<'a> {
    /// Format key resolved through the engine's exporter registry
    Format(String),
    /// Exporter owned by the caller
    Instance(&'a dyn ReportExporter),
}

impl From<&str> for ExporterSelector<'_> {
    fn from(format: &str) -> Self {
        ExporterSelector::Format(format.to_string())
    }
}

impl From<String> for ExporterSelector<'_> {
    fn from(format: String) -> Self {
        ExporterSelector::Format(format)
    }
}

impl<'a> From<&'a dyn ReportExporter> for ExporterSelector<'a> {
    fn from(exporter: &'a dyn ReportExporter) -> Self {
        ExporterSelector::Instance(exporter)
    }
}

/// Summary of a finished generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub format: String,
    pub state: GenerationState,
    pub data_sources: usize,
    pub prepared_elements: usize,
    pub duration_ms: u64,
    pub output_bytes: usize,
}

/// Generated document plus its report
#[derive(Debug)]
pub struct GenerationOutput {
    /// Output positioned at its start
    pub content: Cursor<Vec<u8>>,
    pub report: GenerationReport,
}

/// Tracks the state of one generation
struct Run {
    run_id: Uuid,
    state: GenerationState,
}

impl Run {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: GenerationState::NotStarted,
        }
    }

    fn advance(&mut self, next: GenerationState) {
        debug_assert!(self.state.can_transition_to(next), "{} -> {next}", self.state);
        debug!(from = %self.state, to = %next, "Generation state changed");
        self.state = next;
    }

    /// Move to `Faulted`, recording the state the fault happened in
    fn fault(&mut self, fault: impl Into<GenerationFault>) -> ReportGenerationError {
        let fault = fault.into();
        let state = self.state;
        error!(run_id = %self.run_id, state = %state, error = %fault, "Report generation failed");
        self.state = GenerationState::Faulted;
        ReportGenerationError {
            run_id: self.run_id,
            state,
            fault,
        }
    }
}

/// Runs report generations
///
/// The engine owns read-only state shared by every generation: its
/// configuration, scripting extensions and exporter registry. Templates are
/// borrowed per call, so independent templates can be generated concurrently
/// through one engine.
///
/// # Example
///
/// ```rust
/// use report_composer::data::StaticDataProvider;
/// use report_composer::engine::ReportEngine;
/// use report_composer::models::DataTable;
/// use report_composer::template::{ReportTemplate, VerticalContainerElement};
/// use serde_json::json;
///
/// let mut provider = StaticDataProvider::new();
/// provider.add_table(DataTable::new("t").with_columns(["Id", "Text"]));
/// provider.add_row(0, vec![json!(1), json!("Hello")]).unwrap();
///
/// let mut template = ReportTemplate::default();
/// template.data_sources.set_provider("src", provider);
/// let detail = template.sections.detail_mut();
/// let root = detail.set_root(VerticalContainerElement);
/// detail.tree_mut().add_table(root, "src", None).unwrap();
///
/// let output = ReportEngine::new().generate(&mut template, "csv").unwrap();
/// assert_eq!(output.into_inner(), b"Id;Text\n1;Hello\n");
/// ```
pub struct ReportEngine {
    config: EngineConfig,
    extensions: ExtensionCollection,
    exporters: ExporterRegistry,
}

impl Default for ReportEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEngine {
    /// Engine with default configuration and the built-in JSON scripting provider
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            extensions: ExtensionCollection::with_defaults(),
            exporters: ExporterRegistry::default_builtin(),
        }
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;
        let exporters = ExporterRegistry::from_config(&config)?;
        Ok(Self {
            config,
            extensions: ExtensionCollection::with_defaults(),
            exporters,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn extensions(&self) -> &ExtensionCollection {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionCollection {
        &mut self.extensions
    }

    pub fn exporters(&self) -> &ExporterRegistry {
        &self.exporters
    }

    pub fn exporters_mut(&mut self) -> &mut ExporterRegistry {
        &mut self.exporters
    }

    /// Generate `template` with the selected exporter
    ///
    /// The template's data sources are initialized and retrieved, its
    /// sections prepared, and the result exported. The returned stream is
    /// positioned at its start.
    pub fn generate<'a>(
        &self,
        template: &mut ReportTemplate,
        selector: impl Into<ExporterSelector<'a>>,
    ) -> Result<Cursor<Vec<u8>>, ReportGenerationError> {
        self.generate_with_report(template, selector)
            .map(|output| output.content)
    }

    /// Generate `template` with the configured default format
    pub fn generate_default(
        &self,
        template: &mut ReportTemplate,
    ) -> Result<Cursor<Vec<u8>>, ReportGenerationError> {
        self.generate(template, self.config.default_format.as_str())
    }

    /// Like [`generate`](Self::generate), also returning a [`GenerationReport`]
    pub fn generate_with_report<'a>(
        &self,
        template: &mut ReportTemplate,
        selector: impl Into<ExporterSelector<'a>>,
    ) -> Result<GenerationOutput, ReportGenerationError> {
        let mut run = Run::new();
        let start = Instant::now();

        let selector: ExporterSelector<'a> = selector.into();
        // Exporters created here are dropped when the generation ends
        let created;
        let exporter: &dyn ReportExporter = match selector {
            ExporterSelector::Instance(exporter) => exporter,
            ExporterSelector::Format(format) => match self.exporters.create(&format) {
                Some(exporter) => {
                    created = exporter;
                    created.as_ref()
                }
                None => return Err(run.fault(GenerationFault::ExporterNotFound(format))),
            },
        };

        let _span = info_span!(
            "report_generation",
            run_id = %run.run_id,
            format = exporter.format()
        )
        .entered();

        info!(
            template = %template.description.name,
            data_sources = template.data_sources.len(),
            "Starting report generation"
        );

        run.advance(GenerationState::SourcesInitializing);
        let source_count = self
            .initialize_sources(&mut template.data_sources)
            .map_err(|e| run.fault(e))?;
        run.advance(GenerationState::SourcesReady);

        run.advance(GenerationState::Preparing);
        let prepared_elements = {
            let ReportTemplate {
                data_sources,
                sections,
                ..
            } = &mut *template;
            let mut prepared = 0;
            for section in sections.iter_mut() {
                prepared += prepare_section(section, &*data_sources)
                    .map_err(|e| run.fault(GenerationFault::Preparation(e)))?;
            }
            prepared
        };
        run.advance(GenerationState::Prepared);

        run.advance(GenerationState::Exporting);
        let context = GenerationContext {
            run_id: run.run_id,
            template: &*template,
            extensions: &self.extensions,
        };
        let mut content = exporter
            .export(&context)
            .map_err(|e| run.fault(GenerationFault::Export(e)))?;
        content.set_position(0);
        run.advance(GenerationState::Done);

        let report = GenerationReport {
            run_id: run.run_id,
            format: exporter.format().to_string(),
            state: run.state,
            data_sources: source_count,
            prepared_elements,
            duration_ms: start.elapsed().as_millis() as u64,
            output_bytes: content.get_ref().len(),
        };

        info!(
            duration_ms = report.duration_ms,
            output_bytes = report.output_bytes,
            "Report generation completed"
        );

        Ok(GenerationOutput { content, report })
    }

    /// Initialize and retrieve every data source in registration order
    fn initialize_sources(
        &self,
        sources: &mut DataSourceCollection,
    ) -> Result<usize, DataSourceInitializeError> {
        let mut count = 0;
        for DataSource { name, provider, .. } in sources.iter_mut() {
            let source_name: &str = name;
            debug!(source = source_name, provider = provider.type_name(), "Initializing data source");

            let context = RetrievalContext {
                source_name,
                extensions: &self.extensions,
            };
            provider
                .initialize()
                .and_then(|()| provider.retrieve_data(&context))
                .map_err(|cause| DataSourceInitializeError {
                    source_name: source_name.to_string(),
                    cause,
                })?;

            let tables = provider.data().map(|d| d.tables.len()).unwrap_or(0);
            debug!(source = source_name, tables, "Data source ready");
            count += 1;
        }
        Ok(count)
    }
}
