//! Template serialization
//!
//! Templates travel as documents in which every element and data provider is
//! named by its type key. [`XmlTemplateSerializer`] implements the XML form.

pub mod xml;

pub use xml::XmlTemplateSerializer;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::template::{ElementError, ReportTemplate};
use crate::xml::XmlError;

/// Errors raised while reading or writing templates
#[derive(Error, Debug)]
pub enum SerializationError {
    /// The document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// The document does not have the expected structure
    #[error("Invalid template document: {0}")]
    InvalidDocument(String),

    /// An element or provider has no type key and cannot be written
    #[error("No type key for '{type_name}'")]
    TypeKeyNotFound { type_name: String },

    /// Building the element tree failed
    #[error("Element error: {0}")]
    Element(#[from] ElementError),

    /// IO error with path context
    #[error("IO error with {path}: {source}")]
    IoWithPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerializationError {
    pub fn type_key_not_found(type_name: impl Into<String>) -> Self {
        Self::TypeKeyNotFound {
            type_name: type_name.into(),
        }
    }

    pub fn io_with_path(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SerializationError::TypeKeyNotFound { type_name } => format!(
                "No type key for '{type_name}'\n\nHint: Only registered element and provider types can be saved."
            ),
            SerializationError::Xml(e) => {
                format!("Template is not valid XML: {e}\n\nHint: Check the template file for unclosed or mismatched tags.")
            }
            _ => self.to_string(),
        }
    }
}

/// Reads and writes templates in one document format
pub trait TemplateSerializer {
    /// Build a template from a document
    ///
    /// Recoverable problems, such as unknown type keys, are skipped and
    /// reported through [`warnings`](Self::warnings).
    fn deserialize(&mut self, content: &[u8]) -> Result<ReportTemplate, SerializationError>;

    fn serialize(&self, template: &ReportTemplate) -> Result<Vec<u8>, SerializationError>;

    /// Warnings from the most recent [`deserialize`](Self::deserialize)
    fn warnings(&self) -> &[String];
}
