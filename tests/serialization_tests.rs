//! Template serialization tests

use report_composer::data::{DbDataProvider, ScriptDataProvider};
use report_composer::engine::ReportEngine;
use report_composer::template::{
    DescriptionMetadata, ReportTemplate, ReportTemplateFactory, VerticalContainerElement,
};

fn sample_template() -> ReportTemplate {
    let factory = ReportTemplateFactory::new();
    let mut template = factory.create(DescriptionMetadata::new("Inventory", "Warehouse"));

    let mut script = ScriptDataProvider::new();
    script.set_script(
        "json",
        r#"{"tables":[{"name":"stock","columns":["Item","Count"],"rows":[["bolts",40],["nuts",12]]}]}"#,
    );
    template.data_sources.set_provider("stock", script);

    let mut db = DbDataProvider::new();
    db.set_connection_string("inventory.db")
        .set_connection_type("duckdb")
        .set_queries("SELECT 1\nSELECT 2");
    template.data_sources.set_provider("archive", db);

    let detail = template.sections.detail_mut();
    let root = detail.set_root(VerticalContainerElement);
    let tree = detail.tree_mut();
    tree.properties_mut(root).unwrap().set("height", "1.5");
    tree.add_label(root, "Stock <current> & archived").unwrap();
    let block = tree.add_container(root).unwrap();
    tree.add_table(block, "stock", Some("stock")).unwrap();
    tree.add_separator(block, Some(2.0)).unwrap();
    template
}

mod round_trip_tests {
    use super::*;

    #[test]
    fn test_tree_shape_survives_round_trip() {
        let original = sample_template();
        let mut factory = ReportTemplateFactory::new();

        let bytes = factory.save(&original).unwrap();
        let loaded = factory.load(&bytes).unwrap();

        assert!(factory.warnings().is_empty());
        assert_eq!(loaded.description, original.description);

        let outline = |t: &ReportTemplate| {
            let detail = t.sections.detail();
            detail.tree().outline(detail.root_id().unwrap()).unwrap()
        };
        assert_eq!(outline(&loaded), outline(&original));

        let sources: Vec<_> = loaded.data_sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(sources, vec!["stock", "archive"]);
        for source in original.data_sources.iter() {
            let copy = loaded.data_sources.get_by_name(&source.name).unwrap();
            assert_eq!(copy.provider.type_key(), source.provider.type_key());
            assert_eq!(copy.provider.properties(), source.provider.properties());
        }
    }

    #[test]
    fn test_loaded_template_generates() {
        let mut factory = ReportTemplateFactory::new();
        let bytes = factory.save(&sample_template()).unwrap();
        let mut loaded = factory.load(&bytes).unwrap();
        loaded.data_sources.remove("archive");

        let output = ReportEngine::new().generate(&mut loaded, "csv").unwrap();
        assert_eq!(
            String::from_utf8(output.into_inner()).unwrap(),
            "Item;Count\nbolts;40\nnuts;12\n"
        );
    }
}

mod property_tests {
    use super::*;
    use report_composer::data::{DataProvider, StaticDataProvider};
    use report_composer::serialization::{TemplateSerializer, XmlTemplateSerializer};
    use report_composer::template::ElementOutline;

    fn outline(template: &ReportTemplate) -> ElementOutline {
        let detail = template.sections.detail();
        detail.tree().outline(detail.root_id().unwrap()).unwrap()
    }

    fn round_trip(template: &ReportTemplate) -> ReportTemplate {
        let mut factory = ReportTemplateFactory::new();
        let bytes = factory.save(template).unwrap();
        let loaded = factory.load(&bytes).unwrap();
        assert!(factory.warnings().is_empty());
        loaded
    }

    #[test]
    fn test_multi_valued_and_reserved_keys_survive() {
        let mut template = ReportTemplate::default();
        let detail = template.sections.detail_mut();
        let root = detail.set_root(VerticalContainerElement);
        let tree = detail.tree_mut();
        tree.properties_mut(root)
            .unwrap()
            .set("name", "header-block")
            .set("rootContainer", "x")
            .set("data-source", "orders");
        let label = tree.add_label(root, "Total").unwrap();
        tree.properties_mut(label)
            .unwrap()
            .add("class", "a")
            .add("class", "b")
            .set("type", "bold")
            .set("my key", "spaced");

        let loaded = round_trip(&template);

        assert_eq!(outline(&loaded), outline(&template));
        let root = loaded.sections.detail().root().unwrap();
        assert_eq!(root.properties().get("name").as_deref(), Some("header-block"));
        let label = root.child_elements().next().unwrap();
        assert_eq!(label.properties().get_values("class"), ["a", "b"]);
        assert_eq!(label.properties().get("type").as_deref(), Some("bold"));
    }

    #[test]
    fn test_provider_keys_that_are_not_xml_names_survive() {
        let mut provider = StaticDataProvider::new();
        provider
            .properties_mut()
            .set("my key", "v")
            .set("property", "literal")
            .add("notes", "  padded  ")
            .add("notes", "a ]]> b");
        let mut template = ReportTemplate::default();
        template.data_sources.set_provider("s", provider);

        let bytes = XmlTemplateSerializer::default().serialize(&template).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains(r#"<property key="my key">"#));
        assert!(!xml.contains("<my key>"));

        let loaded = round_trip(&template);
        let source = loaded.data_sources.get_by_name("s").unwrap();
        let original = template.data_sources.get_by_name("s").unwrap();
        assert_eq!(source.provider.properties(), original.provider.properties());
        assert_eq!(source.properties.get("name").as_deref(), Some("s"));
        assert_eq!(source.properties.get("provider").as_deref(), Some("static"));
    }
}

mod document_tests {
    use super::*;

    #[test]
    fn test_unknown_types_are_skipped() {
        let xml = br#"<template>
            <description><name>Partial</name><author/></description>
            <data>
                <source name="legacy" provider="odbc"/>
            </data>
            <layout>
                <section name="detail" rootContainer="verticalContainer">
                    <element type="static" value="kept"/>
                    <element type="chart"/>
                </section>
            </layout>
        </template>"#;

        let mut factory = ReportTemplateFactory::new();
        let template = factory.load(xml).unwrap();

        assert_eq!(factory.warnings().len(), 2);
        assert!(template.data_sources.is_empty());
        let detail = template.sections.detail();
        let root = detail.root().unwrap();
        assert_eq!(root.children().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let mut factory = ReportTemplateFactory::new();
        assert!(factory.load(b"<template><data></template>").is_err());
    }
}
