//! Built-in scripting provider reading data sets from JSON documents
//!
//! Accepted script types: `json`. The script is either an object with a
//! `tables` array or a bare array of tables:
//!
//! ```json
//! { "tables": [ { "name": "people", "columns": ["Id", "Name"], "rows": [[1, "Ada"]] } ] }
//! ```

use serde::Deserialize;
use serde_json::Value;

use super::{ScriptError, ScriptExecutionOptions, ScriptingProvider};
use crate::models::{DataSet, DataTable};

pub const JSON_SCRIPT_TYPE: &str = "json";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonScript {
    Document { tables: Vec<JsonTable> },
    Tables(Vec<JsonTable>),
}

#[derive(Debug, Deserialize)]
struct JsonTable {
    #[serde(default)]
    name: String,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

/// Scripting provider for inline JSON data
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonScriptingProvider;

impl ScriptingProvider for JsonScriptingProvider {
    fn name(&self) -> &str {
        JSON_SCRIPT_TYPE
    }

    fn can_execute(&self, script_type: &str) -> bool {
        script_type.trim().eq_ignore_ascii_case(JSON_SCRIPT_TYPE)
    }

    fn execute(
        &self,
        script: &str,
        options: &ScriptExecutionOptions,
    ) -> Result<Option<DataSet>, ScriptError> {
        if script.trim().is_empty() {
            return Ok(None);
        }
        let parsed: JsonScript =
            serde_json::from_str(script).map_err(|e| ScriptError::compile(JSON_SCRIPT_TYPE, e))?;
        let tables = match parsed {
            JsonScript::Document { tables } | JsonScript::Tables(tables) => tables,
        };

        let mut data = DataSet::new();
        for (index, json_table) in tables.into_iter().enumerate() {
            let name = if json_table.name.is_empty() {
                format!("{}{}", options.source_name, index + 1)
            } else {
                json_table.name
            };
            let mut table = DataTable::new(name).with_columns(json_table.columns);
            for row in json_table.rows {
                table
                    .add_row(row)
                    .map_err(|e| ScriptError::InvalidResult(e.to_string()))?;
            }
            data.add_table(table);
        }
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> ScriptExecutionOptions {
        ScriptExecutionOptions {
            source_name: "people".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_document_form() {
        let script = r#"{"tables":[{"name":"p","columns":["Id","Name"],"rows":[[1,"Ada"],[2]]}]}"#;
        let data = JsonScriptingProvider.execute(script, &options()).unwrap().unwrap();

        let table = &data.tables[0];
        assert_eq!(table.name, "p");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].values, vec![json!(1), json!("Ada")]);
        assert_eq!(table.rows[1].values[1], Value::Null);
    }

    #[test]
    fn test_array_form_names_unnamed_tables() {
        let script = r#"[{"columns":["A"],"rows":[["x"]]}, {"columns":["B"]}]"#;
        let data = JsonScriptingProvider.execute(script, &options()).unwrap().unwrap();
        assert_eq!(data.tables[0].name, "people1");
        assert_eq!(data.tables[1].name, "people2");
    }

    #[test]
    fn test_invalid_json_is_a_compile_error() {
        let err = JsonScriptingProvider.execute("{ nope", &options()).unwrap_err();
        assert!(matches!(err, ScriptError::Compile { .. }));
    }

    #[test]
    fn test_row_wider_than_columns() {
        let script = r#"{"tables":[{"columns":["A"],"rows":[[1,2]]}]}"#;
        let err = JsonScriptingProvider.execute(script, &options()).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidResult(_)));
    }

    #[test]
    fn test_blank_script_returns_nothing() {
        assert!(JsonScriptingProvider.execute("  ", &options()).unwrap().is_none());
        assert!(JsonScriptingProvider.can_execute(" JSON "));
    }
}
