//! Report template object model
//!
//! A [`ReportTemplate`] combines descriptive metadata, the named data sources
//! the report reads from, and its sections. Each section owns an element tree
//! whose nodes are composition elements such as containers, labels, tables
//! and separators.

pub mod element;
pub mod elements;
pub mod factory;
pub mod registry;
pub mod section;

pub use element::{
    CompositionElement, ElementClassification, ElementError, ElementId, ElementOutline,
    ElementRef, ElementTree, MultipleRowsProducer, ScalarValueProducer,
};
pub use elements::{SeparatorElement, StaticLabelElement, TableElement, VerticalContainerElement};
pub use factory::ReportTemplateFactory;
pub use registry::TypeRegistry;
pub use section::{ReportSection, SectionCollection, SectionType};

use serde::{Deserialize, Serialize};

use crate::data::DataSourceCollection;

/// Descriptive metadata of a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionMetadata {
    pub name: String,
    pub author: String,
}

impl DescriptionMetadata {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
        }
    }
}

/// A report template
///
/// Templates are built programmatically or loaded through a
/// [`ReportTemplateFactory`], and consumed by one generation at a time.
///
/// # Example
///
/// ```rust
/// use report_composer::data::StaticDataProvider;
/// use report_composer::models::DataTable;
/// use report_composer::template::{DescriptionMetadata, ReportTemplate, VerticalContainerElement};
/// use serde_json::json;
///
/// let mut template = ReportTemplate::new(DescriptionMetadata::new("Orders", "ops"));
///
/// let mut provider = StaticDataProvider::new();
/// provider.add_table(DataTable::new("orders").with_columns(["Id", "Text"]));
/// provider.add_row(0, vec![json!(1), json!("first")]).unwrap();
/// template.data_sources.set_provider("orders", provider);
///
/// let detail = template.sections.detail_mut();
/// let root = detail.set_root(VerticalContainerElement);
/// detail.tree_mut().add_table(root, "orders", None).unwrap();
///
/// assert_eq!(template.data_sources.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ReportTemplate {
    pub description: DescriptionMetadata,
    pub data_sources: DataSourceCollection,
    pub sections: SectionCollection,
}

impl ReportTemplate {
    pub fn new(description: DescriptionMetadata) -> Self {
        Self {
            description,
            data_sources: DataSourceCollection::new(),
            sections: SectionCollection::new(),
        }
    }
}
