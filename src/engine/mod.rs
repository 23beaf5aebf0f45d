//! Report generation engine
//!
//! A generation moves through
//! `NotStarted → SourcesInitializing → SourcesReady → Preparing → Prepared →
//! Exporting → Done`, or into `Faulted` from any non-terminal state.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod preparation;
pub mod state;

pub use config::{CsvConfig, EngineConfig, OdfConfig, XhtmlConfig};
pub use context::GenerationContext;
pub use error::{ConfigError, DataSourceInitializeError, GenerationFault, ReportGenerationError};
pub use executor::{ExporterSelector, GenerationOutput, GenerationReport, ReportEngine};
pub use state::GenerationState;
