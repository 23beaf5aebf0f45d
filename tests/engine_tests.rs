//! End-to-end generation tests

use std::sync::{Arc, Mutex};

use report_composer::data::{
    ConnectionRegistry, ConnectionState, DataError, DbConnection, DbDataProvider,
    StaticDataProvider,
};
use report_composer::engine::{GenerationFault, GenerationState, ReportEngine};
use report_composer::models::DataTable;
use report_composer::template::{ReportTemplate, VerticalContainerElement};
use serde_json::json;

fn people() -> StaticDataProvider {
    let mut provider = StaticDataProvider::new();
    provider.add_table(DataTable::new("people").with_columns(["Id", "Text"]));
    for (id, text) in [(1, "first"), (2, "second"), (3, "third")] {
        provider.add_row(0, vec![json!(id), json!(text)]).unwrap();
    }
    provider
}

/// Template whose Detail root holds the given label followed by a table
fn template_with_table(source: &str, label: Option<&str>) -> ReportTemplate {
    let mut template = ReportTemplate::default();
    let detail = template.sections.detail_mut();
    let root = detail.set_root(VerticalContainerElement);
    let tree = detail.tree_mut();
    if let Some(label) = label {
        tree.add_label(root, label).unwrap();
    }
    tree.add_table(root, source, None).unwrap();
    template
}

mod csv_tests {
    use super::*;

    #[test]
    fn test_static_table_to_csv() {
        let mut template = template_with_table("people", None);
        template.data_sources.set_provider("people", people());

        let output = ReportEngine::new().generate(&mut template, "csv").unwrap();
        let text = String::from_utf8(output.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines, vec!["Id;Text", "1;first", "2;second", "3;third"]);
    }

    #[test]
    fn test_source_names_are_case_insensitive() {
        let mut template = template_with_table("PEOPLE", None);
        template.data_sources.set_provider("People", StaticDataProvider::new());
        template.data_sources.set_provider("people", people());
        assert_eq!(template.data_sources.len(), 1);

        let output = ReportEngine::new().generate(&mut template, "csv").unwrap();
        assert_eq!(String::from_utf8(output.into_inner()).unwrap().lines().count(), 4);
    }
}

mod xhtml_tests {
    use super::*;

    #[test]
    fn test_text_followed_by_table() {
        let mut template = template_with_table("people", Some("Hello, world!"));
        template.data_sources.set_provider("people", people());

        let output = ReportEngine::new().generate(&mut template, "xhtml").unwrap();
        let html = String::from_utf8(output.into_inner()).unwrap();

        let text = html.find("Hello, world!").unwrap();
        let table = html.find("<table>").unwrap();
        assert!(text < table);
        assert!(html.contains(">third<"));
    }
}

mod odf_tests {
    use super::*;

    #[test]
    fn test_packages_are_zip_archives() {
        for format in ["odt", "ods"] {
            let mut template = template_with_table("people", Some("Title"));
            template.data_sources.set_provider("people", people());

            let output = ReportEngine::new()
                .generate_with_report(&mut template, format)
                .unwrap();

            assert_eq!(output.report.format, format);
            assert_eq!(output.content.position(), 0);
            assert!(output.content.get_ref().starts_with(b"PK"));
        }
    }
}

mod fault_tests {
    use super::*;

    #[test]
    fn test_unregistered_source_is_wrapped() {
        let mut template = template_with_table("missing", None);

        let err = ReportEngine::new().generate(&mut template, "csv").unwrap_err();

        assert_eq!(err.state, GenerationState::Preparing);
        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.to_string().contains("missing"));
        assert!(matches!(
            err.fault,
            GenerationFault::Preparation(DataError::DataSourceNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_format_lists_hint() {
        let err = ReportEngine::new()
            .generate(&mut ReportTemplate::default(), "docx")
            .unwrap_err();
        assert!(err.user_message().contains("Hint:"));
    }
}

mod db_tests {
    use super::*;

    /// Connection whose state is observable after the provider dropped it
    struct SharedStateConnection {
        state: Arc<Mutex<ConnectionState>>,
        fail: bool,
    }

    impl DbConnection for SharedStateConnection {
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
            if self.fail {
                return Err(DataError::query(sql, "relation does not exist"));
            }
            let mut table = DataTable::new("").with_columns(["Id", "Text"]);
            table.add_row(vec![json!(1), json!(sql)])?;
            Ok(table)
        }
    }

    fn db_provider(state: &Arc<Mutex<ConnectionState>>, fail: bool) -> DbDataProvider {
        let state = Arc::clone(state);
        let mut registry = ConnectionRegistry::new();
        registry.register("memory", move |_| {
            Ok(Box::new(SharedStateConnection {
                state: Arc::clone(&state),
                fail,
            }))
        });

        let mut provider = DbDataProvider::with_connection_registry(Arc::new(registry));
        provider
            .set_connection_string("mem://reports")
            .set_connection_type("memory")
            .set_queries("SELECT id, text FROM notes");
        provider
    }

    #[test]
    fn test_internal_connection_closed_after_success() {
        let state = Arc::new(Mutex::new(ConnectionState::Closed));
        let mut template = template_with_table("notes", None);
        template.data_sources.set_provider("notes", db_provider(&state, false));

        let output = ReportEngine::new().generate(&mut template, "csv").unwrap();

        assert_eq!(*state.lock().unwrap(), ConnectionState::Closed);
        assert_eq!(
            String::from_utf8(output.into_inner()).unwrap(),
            "Id;Text\n1;SELECT id, text FROM notes\n"
        );
    }

    #[test]
    fn test_internal_connection_closed_after_failure() {
        let state = Arc::new(Mutex::new(ConnectionState::Closed));
        let mut template = template_with_table("notes", None);
        template.data_sources.set_provider("notes", db_provider(&state, true));

        let err = ReportEngine::new().generate(&mut template, "csv").unwrap_err();

        assert_eq!(*state.lock().unwrap(), ConnectionState::Closed);
        assert_eq!(err.state, GenerationState::SourcesInitializing);
        let source = err.data_source_error().unwrap();
        assert_eq!(source.source_name, "notes");
        assert!(matches!(source.cause, DataError::Query { .. }));
    }
}
