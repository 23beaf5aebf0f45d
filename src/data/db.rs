//! Database-backed data provider
//!
//! The provider runs one query per line of its `queries` property and turns
//! each result into a table. Connections come from a [`ConnectionRegistry`]
//! keyed by connection type, or are supplied by the caller. A connection the
//! provider created itself is closed and dropped after retrieval whether the
//! queries succeed or not; a supplied connection is left to its owner.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use super::{DataError, DataProvider, RetrievalContext};
use crate::models::{DataSet, DataTable, PropertyContainer};

pub const DB_PROVIDER_KEY: &str = "db";
pub const CONNECTION_STRING_PROPERTY: &str = "connectionString";
pub const CONNECTION_TYPE_PROPERTY: &str = "connectionType";
pub const QUERIES_PROPERTY: &str = "queries";

/// State of a database connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
    Broken,
}

/// A database connection able to run queries into tables
pub trait DbConnection: Send {
    fn state(&self) -> ConnectionState;

    fn open(&mut self) -> Result<(), DataError>;

    fn close(&mut self) -> Result<(), DataError>;

    /// Run `sql` and collect the result set
    fn execute_query(&mut self, sql: &str) -> Result<DataTable, DataError>;
}

pub type ConnectionFactory =
    Arc<dyn Fn(&str) -> Result<Box<dyn DbConnection>, DataError> + Send + Sync>;

static DEFAULT_CONNECTIONS: Lazy<Arc<ConnectionRegistry>> =
    Lazy::new(|| Arc::new(ConnectionRegistry::with_defaults()));

/// Maps connection type names to connection factories
///
/// Type names compare case-insensitively. The factory receives the
/// connection string.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    factories: BTreeMap<String, ConnectionFactory>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the backends compiled into this build
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "duckdb-backend")]
        registry.register(super::duckdb::DUCKDB_CONNECTION_TYPE, |cs| {
            Ok(Box::new(super::duckdb::DuckDbConnection::new(cs)))
        });
        registry
    }

    /// Shared registry holding the compiled-in backends
    pub fn shared() -> Arc<ConnectionRegistry> {
        Arc::clone(&DEFAULT_CONNECTIONS)
    }

    pub fn register<F>(&mut self, connection_type: &str, factory: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Box<dyn DbConnection>, DataError> + Send + Sync + 'static,
    {
        self.factories
            .insert(connection_type.to_lowercase(), Arc::new(factory));
        self
    }

    pub fn create(
        &self,
        connection_type: &str,
        connection_string: &str,
    ) -> Result<Box<dyn DbConnection>, DataError> {
        let factory = self
            .factories
            .get(&connection_type.to_lowercase())
            .ok_or_else(|| DataError::ConnectionTypeNotRegistered(connection_type.to_string()))?;
        factory(connection_string)
    }

    /// Whether a factory is registered for `connection_type`, ignoring case
    pub fn contains(&self, connection_type: &str) -> bool {
        self.factories.contains_key(&connection_type.to_lowercase())
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Provider running SQL queries against a database connection
pub struct DbDataProvider {
    properties: PropertyContainer,
    connections: Arc<ConnectionRegistry>,
    connection: Option<Box<dyn DbConnection>>,
    owns_connection: bool,
    queries: Vec<String>,
    data: Option<Arc<DataSet>>,
}

impl Default for DbDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DbDataProvider {
    /// Provider resolving connection types through the shared registry
    pub fn new() -> Self {
        Self::with_connection_registry(ConnectionRegistry::shared())
    }

    pub fn with_connection_registry(connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            properties: PropertyContainer::new(),
            connections,
            connection: None,
            owns_connection: false,
            queries: Vec::new(),
            data: None,
        }
    }

    /// Use a connection owned by the caller
    ///
    /// The provider neither opens nor closes it; take it back with
    /// [`take_connection`](Self::take_connection).
    pub fn with_connection(mut self, connection: Box<dyn DbConnection>) -> Self {
        self.connection = Some(connection);
        self.owns_connection = false;
        self
    }

    pub fn take_connection(&mut self) -> Option<Box<dyn DbConnection>> {
        self.owns_connection = false;
        self.connection.take()
    }

    pub fn connection(&self) -> Option<&dyn DbConnection> {
        self.connection.as_deref()
    }

    pub fn set_connection_string(&mut self, value: impl Into<String>) -> &mut Self {
        self.properties.set(CONNECTION_STRING_PROPERTY, value);
        self
    }

    pub fn set_connection_type(&mut self, value: impl Into<String>) -> &mut Self {
        self.properties.set(CONNECTION_TYPE_PROPERTY, value);
        self
    }

    /// Replace the query list; one query per line
    pub fn set_queries(&mut self, value: impl Into<String>) -> &mut Self {
        self.properties.set(QUERIES_PROPERTY, value);
        self
    }

    /// Queries resolved by the last [`initialize`](DataProvider::initialize)
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    fn property(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_queries(raw: &str) -> Vec<String> {
        raw.lines()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Run every query on `connection`, one table per query
fn run_queries(
    connection: &mut dyn DbConnection,
    queries: &[String],
    open_first: bool,
) -> Result<DataSet, DataError> {
    if open_first && connection.state() != ConnectionState::Open {
        connection.open()?;
    }
    let mut data = DataSet::new();
    for (index, query) in queries.iter().enumerate() {
        let mut table = connection.execute_query(query)?;
        if table.name.is_empty() {
            table.name = format!("Table{}", index + 1);
        }
        debug!(table = %table.name, rows = table.rows.len(), "Query returned");
        data.add_table(table);
    }
    Ok(data)
}

impl DataProvider for DbDataProvider {
    fn type_key(&self) -> Option<&str> {
        Some(DB_PROVIDER_KEY)
    }

    fn properties(&self) -> &PropertyContainer {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyContainer {
        &mut self.properties
    }

    fn initialize(&mut self) -> Result<(), DataError> {
        self.queries = self
            .properties
            .get(QUERIES_PROPERTY)
            .map(|raw| Self::parse_queries(&raw))
            .unwrap_or_default();

        if self.connection.is_some() {
            return Ok(());
        }

        let connection_string = self.property(CONNECTION_STRING_PROPERTY);
        let connection_type = self.property(CONNECTION_TYPE_PROPERTY);
        match (connection_string, connection_type) {
            // Without queries the connection would never be used or closed
            (Some(_), Some(ct)) if self.queries.is_empty() => {
                if !self.connections.contains(&ct) {
                    return Err(DataError::ConnectionTypeNotRegistered(ct));
                }
                debug!(connection_type = %ct, "No queries, skipping connection");
                Ok(())
            }
            (Some(cs), Some(ct)) => {
                debug!(connection_type = %ct, "Creating database connection");
                self.connection = Some(self.connections.create(&ct, &cs)?);
                self.owns_connection = true;
                Ok(())
            }
            (None, None) if self.queries.is_empty() => Ok(()),
            (None, None) => Err(DataError::InvalidConfig(format!(
                "'{QUERIES_PROPERTY}' is set but no connection is configured"
            ))),
            _ => Err(DataError::InvalidConfig(format!(
                "'{CONNECTION_STRING_PROPERTY}' and '{CONNECTION_TYPE_PROPERTY}' must be set together"
            ))),
        }
    }

    fn retrieve_data(&mut self, context: &RetrievalContext<'_>) -> Result<(), DataError> {
        if self.queries.is_empty() {
            debug!(source = %context.source_name, "No queries configured");
            return Ok(());
        }
        let owns = self.owns_connection;
        let connection = self.connection.as_deref_mut().ok_or_else(|| {
            DataError::InvalidConfig("no database connection available".to_string())
        })?;

        let result = run_queries(connection, &self.queries, owns);

        if owns {
            let closed = connection.close();
            self.connection = None;
            self.owns_connection = false;
            match (&result, closed) {
                (Ok(_), Err(e)) => return Err(e),
                (Err(_), Err(e)) => warn!(error = %e, "Closing connection failed"),
                _ => {}
            }
        }

        let data = result?;
        info!(
            source = %context.source_name,
            tables = data.tables.len(),
            "Retrieved database data"
        );
        self.data = Some(Arc::new(data));
        Ok(())
    }

    fn data(&self) -> Option<Arc<DataSet>> {
        self.data.clone()
    }
}

impl fmt::Debug for DbDataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbDataProvider")
            .field("properties", &self.properties)
            .field("connection", &self.connection.as_ref().map(|c| c.state()))
            .field("owns_connection", &self.owns_connection)
            .field("queries", &self.queries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::ExtensionCollection;
    use serde_json::json;
    use std::sync::Mutex;

    /// Connection recording its state into a shared cell
    struct FakeConnection {
        state: Arc<Mutex<ConnectionState>>,
        fail_on: Option<String>,
    }

    impl DbConnection for FakeConnection {
        fn state(&self) -> ConnectionState {
            *self.state.lock().unwrap()
        }

        fn open(&mut self) -> Result<(), DataError> {
            *self.state.lock().unwrap() = ConnectionState::Open;
            Ok(())
        }

        fn close(&mut self) -> Result<(), DataError> {
            *self.state.lock().unwrap() = ConnectionState::Closed;
            Ok(())
        }

        fn execute_query(&mut self, sql: &str) -> Result<DataTable, DataError> {
            if self.state() != ConnectionState::Open {
                return Err(DataError::connection("not open"));
            }
            if self.fail_on.as_deref() == Some(sql) {
                return Err(DataError::query(sql, "boom"));
            }
            let mut table = DataTable::new("").with_columns(["Sql"]);
            table.add_row(vec![json!(sql)])?;
            Ok(table)
        }
    }

    fn registry(state: Arc<Mutex<ConnectionState>>, fail_on: Option<&str>) -> Arc<ConnectionRegistry> {
        let fail_on = fail_on.map(str::to_string);
        let mut registry = ConnectionRegistry::new();
        registry.register("fake", move |_| {
            Ok(Box::new(FakeConnection {
                state: Arc::clone(&state),
                fail_on: fail_on.clone(),
            }))
        });
        Arc::new(registry)
    }

    fn run(provider: &mut DbDataProvider) -> Result<(), DataError> {
        let extensions = ExtensionCollection::new();
        let context = RetrievalContext {
            source_name: "db",
            extensions: &extensions,
        };
        provider.initialize()?;
        provider.retrieve_data(&context)
    }

    #[test]
    fn test_owned_connection_closed_after_success() {
        let state = Arc::new(Mutex::new(ConnectionState::Closed));
        let mut provider = DbDataProvider::with_connection_registry(registry(state.clone(), None));
        provider
            .set_connection_string("mem")
            .set_connection_type("FAKE")
            .set_queries("SELECT 1\n\n  SELECT 2  \n");

        run(&mut provider).unwrap();

        assert_eq!(*state.lock().unwrap(), ConnectionState::Closed);
        assert!(provider.connection().is_none());
        let data = provider.data().unwrap();
        assert_eq!(data.tables.len(), 2);
        assert_eq!(data.tables[0].name, "Table1");
        assert_eq!(data.tables[1].rows[0].text(0), "SELECT 2");
    }

    #[test]
    fn test_owned_connection_closed_after_failure() {
        let state = Arc::new(Mutex::new(ConnectionState::Closed));
        let mut provider =
            DbDataProvider::with_connection_registry(registry(state.clone(), Some("SELECT 2")));
        provider
            .set_connection_string("mem")
            .set_connection_type("fake")
            .set_queries("SELECT 1\nSELECT 2");

        let err = run(&mut provider).unwrap_err();

        assert!(matches!(err, DataError::Query { .. }));
        assert_eq!(*state.lock().unwrap(), ConnectionState::Closed);
        assert!(provider.data().is_none());
    }

    #[test]
    fn test_supplied_connection_is_not_opened_or_closed() {
        let state = Arc::new(Mutex::new(ConnectionState::Open));
        let connection = FakeConnection {
            state: state.clone(),
            fail_on: None,
        };
        let mut provider = DbDataProvider::new().with_connection(Box::new(connection));
        provider.set_queries("SELECT 1");

        run(&mut provider).unwrap();

        assert_eq!(*state.lock().unwrap(), ConnectionState::Open);
        assert!(provider.take_connection().is_some());
    }

    #[test]
    fn test_supplied_closed_connection_is_not_opened() {
        let state = Arc::new(Mutex::new(ConnectionState::Closed));
        let connection = FakeConnection {
            state: state.clone(),
            fail_on: None,
        };
        let mut provider = DbDataProvider::new().with_connection(Box::new(connection));
        provider.set_queries("SELECT 1");

        assert!(matches!(run(&mut provider), Err(DataError::Connection(_))));
        assert_eq!(*state.lock().unwrap(), ConnectionState::Closed);
    }

    #[test]
    fn test_inconsistent_configuration_fails_in_initialize() {
        let mut provider = DbDataProvider::new();
        provider.set_connection_string("mem");
        assert!(matches!(
            provider.initialize(),
            Err(DataError::InvalidConfig(_))
        ));

        let mut provider = DbDataProvider::new();
        provider.set_queries("SELECT 1");
        assert!(matches!(
            provider.initialize(),
            Err(DataError::InvalidConfig(_))
        ));

        let mut provider = DbDataProvider::with_connection_registry(Arc::new(ConnectionRegistry::new()));
        provider.set_connection_string("x").set_connection_type("oracle");
        assert!(matches!(
            provider.initialize(),
            Err(DataError::ConnectionTypeNotRegistered(ref t)) if t == "oracle"
        ));
    }

    #[test]
    fn test_no_queries_creates_no_connection() {
        let state = Arc::new(Mutex::new(ConnectionState::Closed));
        let mut provider = DbDataProvider::with_connection_registry(registry(state.clone(), None));
        provider.set_connection_string("mem").set_connection_type("fake");

        run(&mut provider).unwrap();

        assert!(provider.connection().is_none());
        assert!(provider.data().is_none());
        assert_eq!(*state.lock().unwrap(), ConnectionState::Closed);
    }

    #[test]
    fn test_no_queries_is_a_no_op() {
        let mut provider = DbDataProvider::new();
        run(&mut provider).unwrap();
        assert!(provider.data().is_none());
    }
}
