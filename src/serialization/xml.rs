//! XML template format
//!
//! ```xml
//! <template>
//!   <description><name>Orders</name><author>ops</author></description>
//!   <data>
//!     <source name="orders" provider="db" connectionType="duckdb">
//!       <connectionString><![CDATA[orders.db]]></connectionString>
//!       <queries><![CDATA[SELECT * FROM orders]]></queries>
//!     </source>
//!   </data>
//!   <layout>
//!     <section name="detail" rootContainer="verticalContainer" data-source="orders">
//!       <element type="static" value="Orders"/>
//!       <element type="table"/>
//!     </section>
//!   </layout>
//! </template>
//! ```
//!
//! Attributes of `<source>` other than `name` and `provider`, and its child
//! elements, become provider properties. Attributes of `<element>` other
//! than `type` become element properties; attributes of `<section>` other
//! than `name` and `rootContainer` belong to the root element, whose children
//! are the section's `<element>` children.
//!
//! Properties that cannot be plain attributes or element names (keys holding
//! several values, reserved names, keys that are not XML names) are written
//! as `<property key="...">` children, one per value. Once a key needs this
//! form every later key of the same element uses it too, so key order is
//! kept on reload.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{SerializationError, TemplateSerializer};
use crate::data::DataSource;
use crate::models::PropertyContainer;
use crate::template::{
    DescriptionMetadata, ElementId, ElementRef, ElementTree, ReportTemplate, SectionType,
    TypeRegistry,
};
use crate::xml::{XmlNode, XmlWriter};

const SOURCE_RESERVED: [&str; 2] = ["name", "provider"];
const SECTION_RESERVED: [&str; 2] = ["name", "rootContainer"];
const ELEMENT_TYPE_ATTR: &str = "type";
const PROPERTY_TAG: &str = "property";
const PROPERTY_KEY_ATTR: &str = "key";

/// Whether `key` can be written as a bare attribute or element name
fn is_plain_name(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !key.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("xml"))
}

/// Layout properties split into attributes and `<property>` children
struct LayoutProperties<'a> {
    attributes: Vec<(&'a str, &'a str)>,
    children: Vec<(&'a str, &'a str)>,
}

impl<'a> LayoutProperties<'a> {
    fn split(properties: &'a PropertyContainer, reserved: &[&str]) -> Self {
        let mut split = Self {
            attributes: Vec::new(),
            children: Vec::new(),
        };
        for key in properties.keys() {
            let values = properties.get_values(key);
            match values {
                [value]
                    if split.children.is_empty()
                        && is_plain_name(key)
                        && !reserved.contains(&key) =>
                {
                    split.attributes.push((key, value.as_str()));
                }
                _ => split
                    .children
                    .extend(values.iter().map(|v| (key, v.as_str()))),
            }
        }
        split
    }
}

/// Serializer for the XML template format
#[derive(Debug)]
pub struct XmlTemplateSerializer {
    registry: Arc<TypeRegistry>,
    warnings: Vec<String>,
}

impl Default for XmlTemplateSerializer {
    fn default() -> Self {
        Self::new(TypeRegistry::shared())
    }
}

impl XmlTemplateSerializer {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    fn read_description(node: Option<&XmlNode>) -> DescriptionMetadata {
        match node {
            Some(description) => DescriptionMetadata {
                name: description.child_text("name").unwrap_or_default().to_string(),
                author: description.child_text("author").unwrap_or_default().to_string(),
            },
            None => DescriptionMetadata::default(),
        }
    }

    fn read_source(&mut self, node: &XmlNode) -> Option<DataSource> {
        let name = node.attribute("name").map(str::trim).unwrap_or_default();
        if name.is_empty() {
            self.warn("Skipping data source without a name".to_string());
            return None;
        }
        let key = node.attribute("provider").map(str::trim).unwrap_or_default();
        let Some(mut provider) = self.registry.create_provider(key) else {
            self.warn(format!(
                "Skipping data source '{name}': unknown provider type key '{key}'"
            ));
            return None;
        };

        let properties = provider.properties_mut();
        for (k, v) in &node.attributes {
            if !SOURCE_RESERVED.contains(&k.as_str()) {
                properties.set(k.as_str(), v.as_str());
            }
        }
        for child in &node.children {
            let property = match child.attribute(PROPERTY_KEY_ATTR) {
                Some(key) if child.name == PROPERTY_TAG => key,
                _ => child.name.as_str(),
            };
            properties.add(property, child.text.as_str());
        }
        debug!(source = name, provider = key, "Read data source");
        Some(DataSource::new(name, provider))
    }

    fn read_section(&mut self, node: &XmlNode, template: &mut ReportTemplate) -> Result<(), SerializationError> {
        let name = node.attribute("name").unwrap_or_default();
        let Ok(section_type) = name.parse::<SectionType>() else {
            self.warn(format!("Skipping unknown section '{name}'"));
            return Ok(());
        };
        let key = node.attribute("rootContainer").map(str::trim).unwrap_or_default();
        let Some(root_element) = self.registry.create_element(key) else {
            self.warn(format!(
                "Skipping section '{name}': unknown root type key '{key}'"
            ));
            return Ok(());
        };
        let Some(section) = template.sections.get_mut(section_type) else {
            self.warn(format!("Template has no '{section_type}' section"));
            return Ok(());
        };

        let root = section.set_root_boxed(root_element);
        let tree = section.tree_mut();
        for (k, v) in &node.attributes {
            if !SECTION_RESERVED.contains(&k.as_str()) {
                tree.properties_mut(root)?.add(k.as_str(), v.as_str());
            }
        }
        self.read_children(tree, root, node)
    }

    fn read_children(
        &mut self,
        tree: &mut ElementTree,
        parent: ElementId,
        node: &XmlNode,
    ) -> Result<(), SerializationError> {
        let supports_children = tree.get(parent)?.supports_children();
        for child in &node.children {
            if child.name == PROPERTY_TAG {
                self.read_property(tree, parent, child)?;
                continue;
            }
            if child.name != "element" {
                self.warn(format!("Ignoring unexpected <{}> in layout", child.name));
                continue;
            }
            if !supports_children {
                let parent_key = tree.get(parent)?.type_key().unwrap_or_default().to_string();
                self.warn(format!(
                    "Ignoring element nested under non-container '{parent_key}'"
                ));
                continue;
            }
            self.read_element(tree, parent, child)?;
        }
        Ok(())
    }

    fn read_property(
        &mut self,
        tree: &mut ElementTree,
        id: ElementId,
        node: &XmlNode,
    ) -> Result<(), SerializationError> {
        match node.attribute(PROPERTY_KEY_ATTR) {
            Some(key) if !key.is_empty() => {
                tree.properties_mut(id)?.add(key, node.text.as_str());
            }
            _ => self.warn("Skipping <property> without a key".to_string()),
        }
        Ok(())
    }

    fn read_element(
        &mut self,
        tree: &mut ElementTree,
        parent: ElementId,
        node: &XmlNode,
    ) -> Result<(), SerializationError> {
        let key = node.attribute(ELEMENT_TYPE_ATTR).map(str::trim).unwrap_or_default();
        if key.is_empty() {
            self.warn("Skipping element without a type key".to_string());
            return Ok(());
        }
        let Some(element) = self.registry.create_element(key) else {
            self.warn(format!("Skipping element with unknown type key '{key}'"));
            return Ok(());
        };

        let id = tree.append_boxed(parent, element)?;
        let properties = tree.properties_mut(id)?;
        for (k, v) in &node.attributes {
            if k != ELEMENT_TYPE_ATTR {
                properties.add(k.as_str(), v.as_str());
            }
        }
        self.read_children(tree, id, node)
    }

    fn type_key<'a>(element: ElementRef<'a>) -> Result<&'a str, SerializationError> {
        element
            .type_key()
            .ok_or_else(|| SerializationError::type_key_not_found(element.element().type_name()))
    }

    fn write_property(writer: &mut XmlWriter, key: &str, value: &str) -> Result<(), SerializationError> {
        writer.start(PROPERTY_TAG, &[(PROPERTY_KEY_ATTR, key)])?;
        writer.cdata(value)?;
        writer.end(PROPERTY_TAG)?;
        Ok(())
    }

    fn write_element(writer: &mut XmlWriter, element: ElementRef<'_>) -> Result<(), SerializationError> {
        let key = Self::type_key(element)?;
        let properties = LayoutProperties::split(element.properties(), &[ELEMENT_TYPE_ATTR]);
        let mut attrs: Vec<(&str, &str)> = vec![(ELEMENT_TYPE_ATTR, key)];
        attrs.extend(properties.attributes.iter().copied());

        let children: Vec<ElementRef<'_>> = element.child_elements().collect();
        if children.is_empty() && properties.children.is_empty() {
            writer.empty("element", &attrs)?;
            return Ok(());
        }
        writer.start("element", &attrs)?;
        for (k, v) in &properties.children {
            Self::write_property(writer, k, v)?;
        }
        for child in children {
            Self::write_element(writer, child)?;
        }
        writer.end("element")?;
        Ok(())
    }
}

impl TemplateSerializer for XmlTemplateSerializer {
    fn deserialize(&mut self, content: &[u8]) -> Result<ReportTemplate, SerializationError> {
        self.warnings.clear();
        let text = std::str::from_utf8(content)
            .map_err(|e| SerializationError::InvalidDocument(format!("not UTF-8: {e}")))?;
        let document = XmlNode::parse(text)?;
        if document.name != "template" {
            return Err(SerializationError::InvalidDocument(format!(
                "expected <template> root, found <{}>",
                document.name
            )));
        }

        let mut template = ReportTemplate::new(Self::read_description(document.child("description")));

        if let Some(data) = document.child("data") {
            for source in data.children_named("source") {
                if let Some(source) = self.read_source(source) {
                    template.data_sources.set(source);
                }
            }
        }

        if let Some(layout) = document.child("layout") {
            for section in layout.children_named("section") {
                self.read_section(section, &mut template)?;
            }
        }

        Ok(template)
    }

    fn serialize(&self, template: &ReportTemplate) -> Result<Vec<u8>, SerializationError> {
        let mut writer = XmlWriter::new();
        writer.declaration()?;
        writer.start("template", &[])?;

        writer.start("description", &[])?;
        writer.text_element("name", &[], &template.description.name)?;
        writer.text_element("author", &[], &template.description.author)?;
        writer.end("description")?;

        writer.start("data", &[])?;
        for source in template.data_sources.iter() {
            let provider = &source.provider;
            let key = provider
                .type_key()
                .ok_or_else(|| SerializationError::type_key_not_found(provider.type_name()))?;
            writer.start("source", &[("name", source.name.as_str()), ("provider", key)])?;
            let properties = provider.properties();
            for property in properties.keys() {
                for value in properties.get_values(property) {
                    if is_plain_name(property) && property != PROPERTY_TAG {
                        writer.start(property, &[])?;
                        writer.cdata(value)?;
                        writer.end(property)?;
                    } else {
                        Self::write_property(&mut writer, property, value)?;
                    }
                }
            }
            writer.end("source")?;
        }
        writer.end("data")?;

        writer.start("layout", &[])?;
        for section in template.sections.iter() {
            let Some(root) = section.root() else {
                continue;
            };
            let root_key = Self::type_key(root)?;
            let properties = LayoutProperties::split(root.properties(), &SECTION_RESERVED);
            let mut attrs: Vec<(&str, &str)> = vec![
                ("name", section.section_type().as_str()),
                ("rootContainer", root_key),
            ];
            attrs.extend(properties.attributes.iter().copied());

            writer.start("section", &attrs)?;
            for (k, v) in &properties.children {
                Self::write_property(&mut writer, k, v)?;
            }
            for child in root.child_elements() {
                Self::write_element(&mut writer, child)?;
            }
            writer.end("section")?;
        }
        writer.end("layout")?;

        writer.end("template")?;
        Ok(writer.into_bytes())
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StaticDataProvider;
    use crate::template::{CompositionElement, ElementClassification, VerticalContainerElement};

    fn deserialize(xml: &str) -> (ReportTemplate, Vec<String>) {
        let mut serializer = XmlTemplateSerializer::default();
        let template = serializer.deserialize(xml.as_bytes()).unwrap();
        (template, serializer.warnings().to_vec())
    }

    #[test]
    fn test_reads_sources_and_properties() {
        let xml = r#"<template>
            <description><name>Orders</name><author>ops</author></description>
            <data>
              <source name="Orders" provider="db" connectionType="duckdb">
                <connectionString><![CDATA[:memory:]]></connectionString>
                <queries><![CDATA[SELECT 1
SELECT 2]]></queries>
              </source>
            </data>
          </template>"#;
        let (template, warnings) = deserialize(xml);

        assert!(warnings.is_empty());
        assert_eq!(template.description.name, "Orders");
        let source = template.data_sources.get_by_name("orders").unwrap();
        let props = source.provider.properties();
        assert_eq!(source.provider.type_key(), Some("db"));
        assert_eq!(props.get("connectionType").as_deref(), Some("duckdb"));
        assert_eq!(props.get("connectionString").as_deref(), Some(":memory:"));
        assert_eq!(props.get("queries").as_deref(), Some("SELECT 1\nSELECT 2"));
    }

    #[test]
    fn test_reads_layout_with_root_properties() {
        let xml = r#"<template><layout>
            <section name="Detail" rootContainer="verticalContainer" data-source="orders">
              <element type="static" value="Title"/>
              <element type="verticalContainer" height="2">
                <element type="separator"/>
              </element>
            </section></layout></template>"#;
        let (template, warnings) = deserialize(xml);
        assert!(warnings.is_empty());

        let root = template.sections.detail().root().unwrap();
        assert_eq!(root.properties().get("data-source").as_deref(), Some("orders"));
        let children: Vec<_> = root.child_elements().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].properties().get("value").as_deref(), Some("Title"));
        let separator = children[1].child_elements().next().unwrap();
        assert_eq!(separator.get_property("height", 0u32).unwrap(), 2);
    }

    #[test]
    fn test_unknown_keys_are_skipped_with_warnings() {
        let xml = r#"<template>
            <data><source name="x" provider="ftp"/><source provider="static"/></data>
            <layout><section name="detail" rootContainer="verticalContainer">
              <element type="chart"/>
              <element type=" "/>
              <element type="static" value="kept">
                <element type="static" value="dropped"/>
              </element>
            </section><section name="footer" rootContainer="verticalContainer"/></layout>
          </template>"#;
        let (template, warnings) = deserialize(xml);

        assert!(template.data_sources.is_empty());
        let root = template.sections.detail().root().unwrap();
        assert_eq!(root.child_elements().count(), 1);
        assert_eq!(warnings.len(), 6);
        assert!(warnings.iter().any(|w| w.contains("chart")));
        assert!(warnings.iter().any(|w| w.contains("footer")));
    }

    #[test]
    fn test_rejects_other_roots() {
        let mut serializer = XmlTemplateSerializer::default();
        assert!(matches!(
            serializer.deserialize(b"<report/>"),
            Err(SerializationError::InvalidDocument(_))
        ));
        assert!(matches!(
            serializer.deserialize(b"<template>"),
            Err(SerializationError::Xml(_))
        ));
    }

    #[derive(Debug)]
    struct Anonymous;

    impl CompositionElement for Anonymous {
        fn type_key(&self) -> Option<&str> {
            None
        }

        fn classification(&self) -> ElementClassification {
            ElementClassification::OTHER
        }
    }

    #[test]
    fn test_serialize_requires_type_keys() {
        let mut template = ReportTemplate::default();
        let detail = template.sections.detail_mut();
        let root = detail.set_root(VerticalContainerElement);
        detail.tree_mut().append(root, Anonymous).unwrap();

        let err = XmlTemplateSerializer::default().serialize(&template).unwrap_err();
        assert!(matches!(err, SerializationError::TypeKeyNotFound { ref type_name } if type_name.contains("Anonymous")));
    }

    #[test]
    fn test_plain_names() {
        assert!(is_plain_name("data-source"));
        assert!(is_plain_name("_x.1"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name("my key"));
        assert!(!is_plain_name("1st"));
        assert!(!is_plain_name("ns:attr"));
        assert!(!is_plain_name("xmlns"));
    }

    #[test]
    fn test_split_keeps_key_order() {
        let mut props = PropertyContainer::new();
        props.set("value", "v");
        props.add("class", "a").add("class", "b");
        props.set("height", "2");

        let split = LayoutProperties::split(&props, &[ELEMENT_TYPE_ATTR]);
        assert_eq!(split.attributes, vec![("value", "v")]);
        assert_eq!(
            split.children,
            vec![("class", "a"), ("class", "b"), ("height", "2")]
        );

        let mut props = PropertyContainer::new();
        props.set("type", "bold");
        let split = LayoutProperties::split(&props, &[ELEMENT_TYPE_ATTR]);
        assert!(split.attributes.is_empty());
        assert_eq!(split.children, vec![("type", "bold")]);
    }

    #[test]
    fn test_reads_property_children() {
        let xml = r#"<template><layout>
            <section name="detail" rootContainer="verticalContainer">
              <property key="name"><![CDATA[header]]></property>
              <element type="separator" height="1">
                <property key="class">a</property>
                <property key="class">b</property>
                <property>ignored</property>
              </element>
            </section></layout></template>"#;
        let (template, warnings) = deserialize(xml);

        assert_eq!(warnings.len(), 1);
        let root = template.sections.detail().root().unwrap();
        assert_eq!(root.properties().get("name").as_deref(), Some("header"));
        let separator = root.child_elements().next().unwrap();
        assert_eq!(separator.properties().get_values("class"), ["a", "b"]);
        assert_eq!(separator.properties().get("height").as_deref(), Some("1"));
    }

    #[test]
    fn test_serialize_writes_provider_properties_as_cdata() {
        let mut template = ReportTemplate::new(DescriptionMetadata::new("R", "me"));
        let mut provider = StaticDataProvider::new();
        crate::data::DataProvider::properties_mut(&mut provider).set("note", "a < b");
        template.data_sources.set_provider("s", provider);

        let xml = String::from_utf8(XmlTemplateSerializer::default().serialize(&template).unwrap()).unwrap();
        assert!(xml.contains(r#"<source name="s" provider="static">"#));
        assert!(xml.contains("<note>"));
        assert!(xml.contains("<![CDATA[a < b]]>"));
        assert!(!xml.contains("<section"));
    }
}
