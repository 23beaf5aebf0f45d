//! Data set: the tabular payload a data provider produces

use super::table::{DataTable, TableError};
use serde::{Deserialize, Serialize};

/// Zero or more data tables produced by one data provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataSet {
    #[serde(default)]
    pub tables: Vec<DataTable>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table
    pub fn add_table(&mut self, table: DataTable) -> &mut Self {
        self.tables.push(table);
        self
    }

    /// Look up a table by name
    ///
    /// Names compare case-insensitively.
    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn first_table(&self) -> Option<&DataTable> {
        self.tables.first()
    }

    /// Mutable access to a table by index
    pub fn table_at_mut(&mut self, index: usize) -> Result<&mut DataTable, TableError> {
        let count = self.tables.len();
        self.tables
            .get_mut(index)
            .ok_or(TableError::TableIndexOutOfRange { index, count })
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
