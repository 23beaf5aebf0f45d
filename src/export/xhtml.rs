//! XHTML exporter
//!
//! Every element becomes a `div` holding its children's fragments followed by
//! its own content: scalar values as `span.value`, row producers as tables.
//! Separators are written as `hr` in place of the `div`. An inherited
//! `height` adds a `height-<n>` class to elements that are neither scalar nor
//! tabular.

use std::io::Cursor;

use tracing::debug;

use super::{ExportError, ReportExporter, rows_of, scalar_of};
use crate::engine::GenerationContext;
use crate::models::DataTable;
use crate::template::elements::HEIGHT_PROPERTY;
use crate::template::{ElementClassification, ElementRef};
use crate::xml::{XmlError, XmlWriter};

pub const XHTML_FORMAT: &str = "xhtml";
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
const VALUE_CLASS: &str = "value";

/// Rendered document fragment
#[derive(Debug, Clone, PartialEq)]
enum HtmlNode {
    Element {
        tag: &'static str,
        class: Option<String>,
        children: Vec<HtmlNode>,
    },
    Text(String),
}

impl HtmlNode {
    fn element(tag: &'static str, children: Vec<HtmlNode>) -> Self {
        HtmlNode::Element {
            tag,
            class: None,
            children,
        }
    }

    fn value(text: String) -> Self {
        HtmlNode::Element {
            tag: "span",
            class: Some(VALUE_CLASS.to_string()),
            children: vec![HtmlNode::Text(text)],
        }
    }

    fn write(&self, writer: &mut XmlWriter) -> Result<(), XmlError> {
        match self {
            HtmlNode::Text(text) => {
                writer.text(text)?;
            }
            HtmlNode::Element { tag, class, children } => {
                let attrs: Vec<(&str, &str)> = class.iter().map(|c| ("class", c.as_str())).collect();
                if children.is_empty() && *tag == "hr" {
                    writer.empty(tag, &attrs)?;
                    return Ok(());
                }
                writer.start(tag, &attrs)?;
                for child in children {
                    child.write(writer)?;
                }
                writer.end(tag)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct XhtmlReportExporter {
    stylesheet: Option<String>,
    title_fallback: String,
}

impl Default for XhtmlReportExporter {
    fn default() -> Self {
        Self {
            stylesheet: None,
            title_fallback: "Report".to_string(),
        }
    }
}

impl XhtmlReportExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSS embedded into the document head
    pub fn with_stylesheet(mut self, css: Option<String>) -> Self {
        self.stylesheet = css;
        self
    }

    pub fn with_title_fallback(mut self, title: impl Into<String>) -> Self {
        self.title_fallback = title.into();
        self
    }

    fn render(element: ElementRef<'_>) -> Result<HtmlNode, ExportError> {
        let mut children = element
            .child_elements()
            .map(Self::render)
            .collect::<Result<Vec<_>, _>>()?;
        let mut tag = "div";
        let mut class = None;

        if let Some(value) = scalar_of(element) {
            children.push(HtmlNode::value(value.unwrap_or_default()));
        } else if element.as_rows_producer().is_some() {
            children.push(Self::render_table(rows_of(element)));
        } else {
            if element
                .classification()
                .contains(ElementClassification::SEPARATOR)
            {
                tag = "hr";
            }
            let height: f64 = element.get_property(HEIGHT_PROPERTY, 0.0)?;
            if height > 0.0 {
                class = Some(format!("height-{height}"));
            }
        }

        Ok(HtmlNode::Element {
            tag,
            class,
            children,
        })
    }

    fn render_table(table: Option<&DataTable>) -> HtmlNode {
        let Some(table) = table.filter(|t| !t.rows.is_empty()) else {
            return HtmlNode::element("table", Vec::new());
        };
        let cell = |text: String| HtmlNode::element("td", vec![HtmlNode::value(text)]);

        let header = table
            .column_names()
            .into_iter()
            .map(|name| cell(name.to_string()))
            .collect();
        let rows = table
            .rows
            .iter()
            .map(|row| HtmlNode::element("tr", row.texts().into_iter().map(cell).collect()))
            .collect();

        HtmlNode::element(
            "table",
            vec![
                HtmlNode::element("thead", vec![HtmlNode::element("tr", header)]),
                HtmlNode::element("tbody", rows),
            ],
        )
    }
}

impl ReportExporter for XhtmlReportExporter {
    fn format(&self) -> &str {
        XHTML_FORMAT
    }

    fn file_extension(&self) -> &str {
        "html"
    }

    fn mime_type(&self) -> &str {
        "application/xhtml+xml"
    }

    fn export(&self, context: &GenerationContext<'_>) -> Result<Cursor<Vec<u8>>, ExportError> {
        let body = context.detail_root().map(Self::render).transpose()?;

        let mut writer = XmlWriter::new();
        writer.declaration()?;
        writer.doctype("html")?;
        writer.start("html", &[("xmlns", XHTML_NAMESPACE)])?;
        writer.start("head", &[])?;
        writer.text_element("title", &[], context.title_or(&self.title_fallback))?;
        if let Some(css) = &self.stylesheet {
            writer.text_element("style", &[("type", "text/css")], css)?;
        }
        writer.end("head")?;
        writer.start("body", &[])?;
        if let Some(body) = &body {
            body.write(&mut writer)?;
        }
        writer.end("body")?;
        writer.end("html")?;

        let bytes = writer.into_bytes();
        debug!(bytes = bytes.len(), "Exported XHTML");
        Ok(Cursor::new(bytes))
    }
}
