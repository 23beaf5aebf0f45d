//! DuckDB connection for the database provider
//!
//! Registered under the connection type `duckdb`. The connection string is a
//! database file path; empty or `:memory:` opens an in-memory database.

use serde_json::Value;
use tracing::debug;

use super::db::{ConnectionState, DbConnection};
use super::DataError;
use crate::models::{DataColumn, DataTable};

pub const DUCKDB_CONNECTION_TYPE: &str = "duckdb";

/// Lazily opened DuckDB connection
pub struct DuckDbConnection {
    path: String,
    conn: Option<duckdb::Connection>,
}

impl DuckDbConnection {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            conn: None,
        }
    }

    fn convert(value: duckdb::types::Value) -> Value {
        match value {
            duckdb::types::Value::Null => Value::Null,
            duckdb::types::Value::Boolean(b) => Value::Bool(b),
            duckdb::types::Value::TinyInt(n) => Value::Number(n.into()),
            duckdb::types::Value::SmallInt(n) => Value::Number(n.into()),
            duckdb::types::Value::Int(n) => Value::Number(n.into()),
            duckdb::types::Value::BigInt(n) => Value::Number(n.into()),
            duckdb::types::Value::UTinyInt(n) => Value::Number(n.into()),
            duckdb::types::Value::USmallInt(n) => Value::Number(n.into()),
            duckdb::types::Value::UInt(n) => Value::Number(n.into()),
            duckdb::types::Value::UBigInt(n) => Value::Number(n.into()),
            duckdb::types::Value::Float(f) => serde_json::Number::from_f64(f as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            duckdb::types::Value::Double(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            duckdb::types::Value::Text(s) => Value::String(s),
            _ => Value::String(format!("{:?}", value)),
        }
    }
}

impl DbConnection for DuckDbConnection {
    fn state(&self) -> ConnectionState {
        if self.conn.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    fn open(&mut self) -> Result<(), DataError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let path = self.path.trim();
        let conn = if path.is_empty() || path == ":memory:" {
            duckdb::Connection::open_in_memory()
        } else {
            duckdb::Connection::open(path)
        }
        .map_err(DataError::connection)?;
        debug!(path = %self.path, "Opened DuckDB connection");
        self.conn = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DataError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| DataError::connection(e)),
            None => Ok(()),
        }
    }

    fn execute_query(&mut self, sql: &str) -> Result<DataTable, DataError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| DataError::connection("DuckDB connection is not open"))?;
        let query_err = |e: duckdb::Error| DataError::query(sql, e.to_string());

        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;

        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<DataColumn> = (0..column_count)
            .map(|i| {
                rows.as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .map(DataColumn::new)
            .collect();

        let mut table = DataTable::new("").with_columns(columns);
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: duckdb::types::Value = row.get(i).map_err(query_err)?;
                values.push(Self::convert(value));
            }
            table.add_row(values)?;
        }
        Ok(table)
    }
}
