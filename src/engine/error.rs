//! Error types for report generation
//!
//! [`ReportGenerationError`] is the only error that leaves
//! [`ReportEngine::generate`](super::ReportEngine::generate). Its cause chain
//! keeps the original failure, wrapped in a [`DataSourceInitializeError`]
//! when a data source failed.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use super::state::GenerationState;
use crate::data::DataError;
use crate::export::ExportError;

/// A named data source failed to initialize or retrieve its data
#[derive(Error, Debug)]
#[error("Data source '{source_name}' failed to initialize: {cause}")]
pub struct DataSourceInitializeError {
    pub source_name: String,
    #[source]
    pub cause: DataError,
}

/// What went wrong during a generation
#[derive(Error, Debug)]
pub enum GenerationFault {
    #[error("{0}")]
    DataSourceInitialize(#[from] DataSourceInitializeError),

    #[error("Preparation failed: {0}")]
    Preparation(#[source] DataError),

    #[error("No exporter registered for format '{0}'")]
    ExporterNotFound(String),

    #[error("Export failed: {0}")]
    Export(#[source] ExportError),
}

/// Top-level failure of a report generation
#[derive(Error, Debug)]
#[error("Report generation {run_id} failed while {state}: {fault}")]
pub struct ReportGenerationError {
    pub run_id: Uuid,
    /// State the generation was in when the fault happened
    pub state: GenerationState,
    #[source]
    pub fault: GenerationFault,
}

impl ReportGenerationError {
    /// The data source failure, if a data source caused the fault
    pub fn data_source_error(&self) -> Option<&DataSourceInitializeError> {
        match &self.fault {
            GenerationFault::DataSourceInitialize(e) => Some(e),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match &self.fault {
            GenerationFault::DataSourceInitialize(e) => format!(
                "Data source '{}' failed: {}",
                e.source_name,
                e.cause.user_message()
            ),
            GenerationFault::Preparation(e) => format!("Preparing the layout failed: {}", e.user_message()),
            GenerationFault::ExporterNotFound(format) => format!(
                "No exporter registered for format '{format}'\n\nHint: Run 'report-composer formats' to list the available formats."
            ),
            GenerationFault::Export(e) => format!("Export failed: {e}"),
        }
    }
}

/// Errors raised while loading or validating engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error with {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Invalid(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your engine configuration file.")
            }
            _ => self.to_string(),
        }
    }
}
