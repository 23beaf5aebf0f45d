//! Column schema for tabular report data

use serde::{Deserialize, Serialize};

/// A column in a [`DataTable`](super::DataTable) schema
///
/// The position of a column in its table's column list is its ordinal; row
/// values are stored in the same order.
///
/// # Example
///
/// ```rust
/// use report_composer::models::DataColumn;
///
/// let column = DataColumn::new("Id").with_data_type("INTEGER");
/// assert_eq!(column.name, "Id");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataColumn {
    /// Column name, used for header rows
    pub name: String,
    /// Source data type as reported by the provider, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl DataColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    /// Set the source data type
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }
}

impl From<&str> for DataColumn {
    fn from(name: &str) -> Self {
        DataColumn::new(name)
    }
}

impl From<String> for DataColumn {
    fn from(name: String) -> Self {
        DataColumn::new(name)
    }
}
