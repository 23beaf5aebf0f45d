//! Context handed to exporters

use std::sync::Arc;

use uuid::Uuid;

use crate::data::{DataError, DataPreparationContext};
use crate::models::DataSet;
use crate::scripting::ExtensionCollection;
use crate::template::{ElementRef, ReportSection, ReportTemplate};

/// A prepared template plus the engine state an exporter may read
///
/// Exporters keep no template state of their own, so one exporter instance
/// can serve several generations.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    pub run_id: Uuid,
    pub template: &'a ReportTemplate,
    pub extensions: &'a ExtensionCollection,
}

impl<'a> GenerationContext<'a> {
    pub fn new(template: &'a ReportTemplate, extensions: &'a ExtensionCollection) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            template,
            extensions,
        }
    }

    pub fn detail_section(&self) -> &'a ReportSection {
        self.template.sections.detail()
    }

    /// Root element of the Detail section
    pub fn detail_root(&self) -> Option<ElementRef<'a>> {
        self.detail_section().root()
    }

    /// Template name, or `fallback` when it is blank
    pub fn title_or<'b>(&self, fallback: &'b str) -> &'b str
    where
        'a: 'b,
    {
        let name = self.template.description.name.trim();
        if name.is_empty() { fallback } else { name }
    }
}

impl DataPreparationContext for GenerationContext<'_> {
    fn request_data_container(&self, name: &str) -> Result<Option<Arc<DataSet>>, DataError> {
        self.template.data_sources.request_data_container(name)
    }
}
