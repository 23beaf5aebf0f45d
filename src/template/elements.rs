//! Built-in element variants

use std::sync::Arc;

use tracing::debug;

use super::element::{
    CompositionElement, ElementClassification, ElementError, ElementId, ElementRef,
    ElementTree, MultipleRowsProducer, ScalarValueProducer,
};
use crate::data::{DataError, DataPreparationContext};
use crate::models::{DataSet, DataTable};

pub const VERTICAL_CONTAINER_KEY: &str = "verticalContainer";
pub const STATIC_LABEL_KEY: &str = "static";
pub const TABLE_KEY: &str = "table";
pub const SEPARATOR_KEY: &str = "separator";

/// Property holding a label's text
pub const VALUE_PROPERTY: &str = "value";
/// Property naming the data source a table reads from; inherited
pub const DATA_SOURCE_PROPERTY: &str = "data-source";
/// Property naming the table within the data set; inherited
pub const DATA_TABLE_PROPERTY: &str = "data-table";
/// Property giving a rule or block height; inherited
pub const HEIGHT_PROPERTY: &str = "height";

/// Container stacking its children top to bottom
#[derive(Debug, Default, Clone, Copy)]
pub struct VerticalContainerElement;

impl CompositionElement for VerticalContainerElement {
    fn type_key(&self) -> Option<&str> {
        Some(VERTICAL_CONTAINER_KEY)
    }

    fn classification(&self) -> ElementClassification {
        ElementClassification::CONTAINER
    }

    fn supports_children(&self) -> bool {
        true
    }
}

/// Text label whose value is its `value` property
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticLabelElement;

impl CompositionElement for StaticLabelElement {
    fn type_key(&self) -> Option<&str> {
        Some(STATIC_LABEL_KEY)
    }

    fn classification(&self) -> ElementClassification {
        ElementClassification::TEXT
    }

    fn as_scalar_producer(&self) -> Option<&dyn ScalarValueProducer> {
        Some(self)
    }
}

impl ScalarValueProducer for StaticLabelElement {
    fn value(&self, element: ElementRef<'_>) -> Option<String> {
        element.properties().get(VALUE_PROPERTY)
    }
}

/// Table bound to a data source
///
/// During preparation the element resolves its (possibly inherited)
/// `data-source` property and keeps the source's data set. Rows come from the
/// table named by `data-table`, or from the first table when unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableElement;

impl CompositionElement for TableElement {
    fn type_key(&self) -> Option<&str> {
        Some(TABLE_KEY)
    }

    fn classification(&self) -> ElementClassification {
        ElementClassification::TABLE
    }

    fn prepare(
        &self,
        element: ElementRef<'_>,
        context: &dyn DataPreparationContext,
    ) -> Result<Option<Arc<DataSet>>, DataError> {
        let source: String = element.get_property(DATA_SOURCE_PROPERTY, String::new())?;
        if source.trim().is_empty() {
            return Err(DataError::InvalidConfig(format!(
                "table element {} has no '{DATA_SOURCE_PROPERTY}' property",
                element.id()
            )));
        }
        let data = context.request_data_container(&source)?;
        debug!(
            element = %element.id(),
            source = %source,
            bound = data.is_some(),
            "Bound table element"
        );
        Ok(data)
    }

    fn as_rows_producer(&self) -> Option<&dyn MultipleRowsProducer> {
        Some(self)
    }
}

impl MultipleRowsProducer for TableElement {
    fn table<'a>(&self, element: ElementRef<'a>) -> Option<&'a DataTable> {
        let data = element.binding()?;
        let name: String = element
            .get_property(DATA_TABLE_PROPERTY, String::new())
            .unwrap_or_default();
        if name.is_empty() {
            data.first_table()
        } else {
            data.table(&name)
        }
    }
}

/// Horizontal rule; honours an inherited `height`
#[derive(Debug, Default, Clone, Copy)]
pub struct SeparatorElement;

impl CompositionElement for SeparatorElement {
    fn type_key(&self) -> Option<&str> {
        Some(SEPARATOR_KEY)
    }

    fn classification(&self) -> ElementClassification {
        ElementClassification::SEPARATOR
    }
}

/// Shorthands for building layouts in code
impl ElementTree {
    pub fn add_container(&mut self, parent: ElementId) -> Result<ElementId, ElementError> {
        self.append(parent, VerticalContainerElement)
    }

    pub fn add_label(
        &mut self,
        parent: ElementId,
        value: impl Into<String>,
    ) -> Result<ElementId, ElementError> {
        let id = self.append(parent, StaticLabelElement)?;
        self.properties_mut(id)?.set(VALUE_PROPERTY, value);
        Ok(id)
    }

    pub fn add_table(
        &mut self,
        parent: ElementId,
        data_source: impl Into<String>,
        data_table: Option<&str>,
    ) -> Result<ElementId, ElementError> {
        let id = self.append(parent, TableElement)?;
        let props = self.properties_mut(id)?;
        props.set(DATA_SOURCE_PROPERTY, data_source);
        if let Some(table) = data_table {
            props.set(DATA_TABLE_PROPERTY, table);
        }
        Ok(id)
    }

    pub fn add_separator(
        &mut self,
        parent: ElementId,
        height: Option<f64>,
    ) -> Result<ElementId, ElementError> {
        let id = self.append(parent, SeparatorElement)?;
        if let Some(height) = height {
            self.properties_mut(id)?.set(HEIGHT_PROPERTY, height.to_string());
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSourceCollection, StaticDataProvider};
    use serde_json::json;

    fn orders_source() -> DataSourceCollection {
        let mut provider = StaticDataProvider::new();
        provider.add_table(DataTable::new("Lines").with_columns(["Sku"]));
        provider.add_table(DataTable::new("Orders").with_columns(["Id"]));
        provider.add_row(1, vec![json!(10)]).unwrap();

        let mut sources = DataSourceCollection::new();
        sources.set_provider("Orders", provider);
        sources
    }

    #[test]
    fn test_label_value() {
        let mut tree = ElementTree::new();
        let root = tree.insert(VerticalContainerElement);
        let label = tree.add_label(root, "Hello, world!").unwrap();

        let element = tree.get(label).unwrap();
        let producer = element.as_scalar_producer().unwrap();
        assert_eq!(producer.value(element).as_deref(), Some("Hello, world!"));
        assert!(element.as_rows_producer().is_none());
    }

    #[test]
    fn test_table_prepare_uses_inherited_source_and_named_table() {
        let sources = orders_source();
        let mut tree = ElementTree::new();
        let root = tree.insert(VerticalContainerElement);
        tree.properties_mut(root)
            .unwrap()
            .set(DATA_SOURCE_PROPERTY, "orders");
        let table = tree.append(root, TableElement).unwrap();
        tree.properties_mut(table)
            .unwrap()
            .set(DATA_TABLE_PROPERTY, "orders");

        let element = tree.get(table).unwrap();
        let binding = TableElement.prepare(element, &sources).unwrap();
        tree.bind(table, binding).unwrap();

        let element = tree.get(table).unwrap();
        let rows = element.as_rows_producer().unwrap().table(element).unwrap();
        assert_eq!(rows.name, "Orders");
        assert_eq!(rows.rows.len(), 1);
    }

    #[test]
    fn test_table_defaults_to_first_table() {
        let sources = orders_source();
        let mut tree = ElementTree::new();
        let root = tree.insert(VerticalContainerElement);
        let table = tree.add_table(root, "Orders", None).unwrap();

        let binding = TableElement.prepare(tree.get(table).unwrap(), &sources).unwrap();
        tree.bind(table, binding).unwrap();

        let element = tree.get(table).unwrap();
        assert_eq!(TableElement.table(element).map(|t| t.name.as_str()), Some("Lines"));
    }

    #[test]
    fn test_table_prepare_unknown_source() {
        let sources = DataSourceCollection::new();
        let mut tree = ElementTree::new();
        let root = tree.insert(VerticalContainerElement);
        let table = tree.add_table(root, "nowhere", None).unwrap();

        let err = TableElement
            .prepare(tree.get(table).unwrap(), &sources)
            .unwrap_err();
        assert!(matches!(err, DataError::DataSourceNotFound(ref n) if n == "nowhere"));
    }

    #[test]
    fn test_table_without_source_property() {
        let sources = DataSourceCollection::new();
        let mut tree = ElementTree::new();
        let table = tree.insert(TableElement);

        assert!(matches!(
            TableElement.prepare(tree.get(table).unwrap(), &sources),
            Err(DataError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unprepared_table_has_no_rows() {
        let mut tree = ElementTree::new();
        let table = tree.insert(TableElement);
        assert!(TableElement.table(tree.get(table).unwrap()).is_none());
    }

    #[test]
    fn test_separator_height_shorthand() {
        let mut tree = ElementTree::new();
        let root = tree.insert(VerticalContainerElement);
        let sep = tree.add_separator(root, Some(2.0)).unwrap();
        assert_eq!(tree.properties(sep).unwrap().get(HEIGHT_PROPERTY).as_deref(), Some("2"));
        assert_eq!(tree.get_property(sep, HEIGHT_PROPERTY, 0.0f64).unwrap(), 2.0);
    }
}
