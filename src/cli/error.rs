//! CLI error types

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::{ConfigError, ReportGenerationError};
use crate::serialization::SerializationError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Template error: {0}")]
    Template(#[from] SerializationError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Generation(#[from] ReportGenerationError),
}

impl CliError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CliError::Template(e) => e.user_message(),
            CliError::Config(e) => e.user_message(),
            CliError::Generation(e) => e.user_message(),
            CliError::FileWriteError(path, reason) => format!(
                "Failed to write {}: {reason}\n\nHint: Check that the output directory exists and is writable.",
                path.display()
            ),
            CliError::InvalidArgument(_) => self.to_string(),
        }
    }
}
