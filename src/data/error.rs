//! Error types for data sources and providers

use thiserror::Error;

use crate::models::TableError;
use crate::scripting::ScriptError;
use crate::template::ElementError;

/// Errors raised while configuring, initializing or reading data providers
#[derive(Error, Debug)]
pub enum DataError {
    /// No data source is registered under the name
    #[error("Data source not found: {0}")]
    DataSourceNotFound(String),

    /// Provider or element configuration is inconsistent
    #[error("Invalid data configuration: {0}")]
    InvalidConfig(String),

    /// No connection factory is registered for the connection type
    #[error("Connection type not registered: {0}")]
    ConnectionTypeNotRegistered(String),

    /// Opening, closing or using a connection failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query failed
    #[error("Query failed: {message}")]
    Query { query: String, message: String },

    /// Script execution failed
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Element property lookup failed during preparation
    #[error(transparent)]
    Element(#[from] ElementError),

    /// Building a data table failed
    #[error(transparent)]
    Table(#[from] TableError),
}

impl DataError {
    pub fn query(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
            message: message.into(),
        }
    }

    pub fn connection(message: impl std::fmt::Display) -> Self {
        Self::Connection(message.to_string())
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            DataError::DataSourceNotFound(name) => format!(
                "Data source not found: {name}\n\nHint: Check the 'data-source' property against the <source name=...> entries of the template."
            ),
            DataError::ConnectionTypeNotRegistered(kind) => format!(
                "Connection type not registered: {kind}\n\nHint: Enable the matching backend feature (for example 'duckdb-backend')."
            ),
            DataError::Query { query, message } => {
                format!("Query failed: {message}\n\nQuery: {query}")
            }
            _ => self.to_string(),
        }
    }
}
