//! Provider serving tables assembled in code

use std::sync::Arc;

use serde_json::Value;

use super::{DataError, DataProvider, RetrievalContext};
use crate::models::{DataSet, DataTable, PropertyContainer};

pub const STATIC_PROVIDER_KEY: &str = "static";

/// Provider whose data set is filled before generation; retrieval is a no-op
#[derive(Debug, Default, Clone)]
pub struct StaticDataProvider {
    properties: PropertyContainer,
    data: Arc<DataSet>,
}

impl StaticDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: DataTable) -> &mut Self {
        Arc::make_mut(&mut self.data).add_table(table);
        self
    }

    /// Append a row to the table at `table_index`
    pub fn add_row(&mut self, table_index: usize, values: Vec<Value>) -> Result<&mut Self, DataError> {
        Arc::make_mut(&mut self.data)
            .table_at_mut(table_index)?
            .add_row(values)?;
        Ok(self)
    }
}

impl DataProvider for StaticDataProvider {
    fn type_key(&self) -> Option<&str> {
        Some(STATIC_PROVIDER_KEY)
    }

    fn properties(&self) -> &PropertyContainer {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyContainer {
        &mut self.properties
    }

    fn retrieve_data(&mut self, _context: &RetrievalContext<'_>) -> Result<(), DataError> {
        Ok(())
    }

    fn data(&self) -> Option<Arc<DataSet>> {
        Some(Arc::clone(&self.data))
    }
}
