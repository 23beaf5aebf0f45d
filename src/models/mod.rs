//! Models module
//!
//! Defines the plain data structures shared by templates, data providers and
//! exporters: the property container that backs every template object and the
//! tabular data model that providers produce.

pub mod column;
pub mod data_set;
pub mod properties;
pub mod table;

pub use column::DataColumn;
pub use data_set::DataSet;
pub use properties::PropertyContainer;
pub use table::{DataRow, DataTable, TableError, cell_text};
