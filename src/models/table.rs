//! Data table model for report data

use super::column::DataColumn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while building tables
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A row carried more values than the table has columns
    #[error("Table '{table}' has {expected} column(s) but the row has {found} value(s)")]
    TooManyValues {
        table: String,
        expected: usize,
        found: usize,
    },

    /// A column was referenced by name but does not exist
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// A table index was out of range
    #[error("Table index {index} out of range ({count} table(s))")]
    TableIndexOutOfRange { index: usize, count: usize },
}

/// A single row of cell values, ordered like its table's columns
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataRow {
    pub values: Vec<Value>,
}

impl DataRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get the value at a column ordinal
    pub fn get(&self, ordinal: usize) -> Option<&Value> {
        self.values.get(ordinal)
    }

    /// Render the value at a column ordinal as display text
    pub fn text(&self, ordinal: usize) -> String {
        self.values.get(ordinal).map(cell_text).unwrap_or_default()
    }

    /// Render every value as display text
    pub fn texts(&self) -> Vec<String> {
        self.values.iter().map(cell_text).collect()
    }
}

/// Render a cell value the way exporters print it
///
/// Strings are written without quotes and nulls as empty text.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Named table with a fixed column schema and ordered rows
///
/// # Example
///
/// ```rust
/// use report_composer::models::DataTable;
/// use serde_json::json;
///
/// let mut table = DataTable::new("people").with_columns(["Id", "Text"]);
/// table.add_row(vec![json!(1), json!("Hello")]).unwrap();
/// assert_eq!(table.rows.len(), 1);
/// assert_eq!(table.column_names(), vec!["Id", "Text"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataTable {
    pub name: String,
    pub columns: Vec<DataColumn>,
    #[serde(default)]
    pub rows: Vec<DataRow>,
}

impl DataTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Append columns to the schema
    pub fn with_columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<DataColumn>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append a column to the schema
    pub fn add_column(&mut self, column: impl Into<DataColumn>) -> &mut Self {
        self.columns.push(column.into());
        self
    }

    /// Append a row
    ///
    /// Rows shorter than the schema are padded with nulls.
    pub fn add_row(&mut self, mut values: Vec<Value>) -> Result<&mut Self, TableError> {
        if values.len() > self.columns.len() {
            return Err(TableError::TooManyValues {
                table: self.name.clone(),
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(DataRow::new(values));
        Ok(self)
    }

    /// Column names in ordinal order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Ordinal of a column by name
    pub fn ordinal(&self, column: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| TableError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
