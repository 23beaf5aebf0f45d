//! Data sources and data providers
//!
//! A [`DataSource`] binds a name used by the layout to a [`DataProvider`]
//! that produces a [`DataSet`]. Providers are initialized and asked for
//! their data once per generation, before the preparation pass binds the
//! results onto table elements.

pub mod db;
#[cfg(feature = "duckdb-backend")]
pub mod duckdb;
pub mod error;
pub mod script;
pub mod static_provider;

pub use db::{ConnectionRegistry, ConnectionState, DbConnection, DbDataProvider};
pub use error::DataError;
pub use script::ScriptDataProvider;
pub use static_provider::StaticDataProvider;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::models::{DataSet, PropertyContainer};
use crate::scripting::ExtensionCollection;

/// What a provider may use while retrieving data
pub struct RetrievalContext<'a> {
    /// Name of the data source being retrieved
    pub source_name: &'a str,
    /// Engine extensions, such as scripting providers
    pub extensions: &'a ExtensionCollection,
}

/// Produces a tabular data set on demand
///
/// The engine calls [`initialize`](Self::initialize) and then
/// [`retrieve_data`](Self::retrieve_data) exactly once per generation.
pub trait DataProvider: fmt::Debug + Send {
    /// Stable wire identifier, `None` for providers that cannot be serialized
    fn type_key(&self) -> Option<&str>;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn properties(&self) -> &PropertyContainer;

    fn properties_mut(&mut self) -> &mut PropertyContainer;

    /// Resolve configuration; fails fast when it is inconsistent
    fn initialize(&mut self) -> Result<(), DataError> {
        Ok(())
    }

    /// Populate the provider's data set
    fn retrieve_data(&mut self, context: &RetrievalContext<'_>) -> Result<(), DataError>;

    /// Data produced by the last retrieval, if any
    fn data(&self) -> Option<Arc<DataSet>>;
}

/// Lookup of data containers used by the preparation pass
pub trait DataPreparationContext {
    /// Data of the named source; fails when no such source is registered
    fn request_data_container(&self, name: &str) -> Result<Option<Arc<DataSet>>, DataError>;
}

pub const SOURCE_NAME_PROPERTY: &str = "name";
pub const SOURCE_PROVIDER_PROPERTY: &str = "provider";

/// A named binding between a report and a data provider
///
/// `properties` describes the binding itself: it holds the source name and,
/// for serializable providers, the provider's type key.
#[derive(Debug)]
pub struct DataSource {
    pub name: String,
    pub provider: Box<dyn DataProvider>,
    pub properties: PropertyContainer,
}

impl DataSource {
    pub fn new(name: impl Into<String>, provider: Box<dyn DataProvider>) -> Self {
        let name = name.into();
        let mut properties = PropertyContainer::new();
        properties.set(SOURCE_NAME_PROPERTY, name.as_str());
        if let Some(key) = provider.type_key() {
            properties.set(SOURCE_PROVIDER_PROPERTY, key);
        }
        Self {
            name,
            provider,
            properties,
        }
    }
}

/// Name-keyed data sources
///
/// Names compare case-insensitively; registering a name that already exists
/// replaces the earlier source in place. Iteration follows registration order.
#[derive(Debug, Default)]
pub struct DataSourceCollection {
    sources: Vec<DataSource>,
}

impl DataSourceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source`, overwriting any source with the same name
    pub fn set(&mut self, source: DataSource) {
        match self.position(&source.name) {
            Some(index) => {
                debug!(name = %source.name, "Replacing data source");
                self.sources[index] = source;
            }
            None => self.sources.push(source),
        }
    }

    /// Register a provider under `name`
    pub fn set_provider(&mut self, name: impl Into<String>, provider: impl DataProvider + 'static) {
        self.set(DataSource::new(name, Box::new(provider)));
    }

    pub fn get_by_name(&self, name: &str) -> Result<&DataSource, DataError> {
        self.position(name)
            .map(|i| &self.sources[i])
            .ok_or_else(|| DataError::DataSourceNotFound(name.to_string()))
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Result<&mut DataSource, DataError> {
        match self.position(name) {
            Some(i) => Ok(&mut self.sources[i]),
            None => Err(DataError::DataSourceNotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<DataSource> {
        self.position(name).map(|i| self.sources.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DataSource> {
        self.sources.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = name.to_lowercase();
        self.sources.iter().position(|s| s.name.to_lowercase() == key)
    }
}

impl DataPreparationContext for DataSourceCollection {
    fn request_data_container(&self, name: &str) -> Result<Option<Arc<DataSet>>, DataError> {
        Ok(self.get_by_name(name)?.provider.data())
    }
}
