//! Creating, loading and saving templates

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::registry::TypeRegistry;
use super::{DescriptionMetadata, ReportTemplate};
use crate::serialization::{SerializationError, TemplateSerializer, XmlTemplateSerializer};

/// Entry point for obtaining templates
pub struct ReportTemplateFactory {
    serializer: Box<dyn TemplateSerializer>,
}

impl Default for ReportTemplateFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportTemplateFactory {
    /// Factory using the XML format and the built-in types
    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::shared())
    }

    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self::with_serializer(Box::new(XmlTemplateSerializer::new(registry)))
    }

    pub fn with_serializer(serializer: Box<dyn TemplateSerializer>) -> Self {
        Self { serializer }
    }

    /// Empty template with a Detail section and no data sources
    pub fn create(&self, description: DescriptionMetadata) -> ReportTemplate {
        ReportTemplate::new(description)
    }

    pub fn load(&mut self, content: &[u8]) -> Result<ReportTemplate, SerializationError> {
        let template = self.serializer.deserialize(content)?;
        for warning in self.serializer.warnings() {
            warn!("{warning}");
        }
        info!(
            name = %template.description.name,
            sources = template.data_sources.len(),
            "Loaded report template"
        );
        Ok(template)
    }

    pub fn load_from_reader<R: Read>(&mut self, mut reader: R) -> Result<ReportTemplate, SerializationError> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        self.load(&content)
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<ReportTemplate, SerializationError> {
        let content = std::fs::read(path).map_err(|e| SerializationError::io_with_path(path, e))?;
        self.load(&content)
    }

    pub fn save(&self, template: &ReportTemplate) -> Result<Vec<u8>, SerializationError> {
        self.serializer.serialize(template)
    }

    /// Warnings recorded by the most recent load
    pub fn warnings(&self) -> &[String] {
        self.serializer.warnings()
    }
}
