//! OpenDocument packaging shared by the ODT and ODS exporters
//!
//! A package is a ZIP archive whose first entry is the uncompressed
//! `mimetype`, followed by the manifest, content, styles and metadata parts.
//! Packages are staged in an anonymous temporary file which is removed when
//! it is dropped.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde_json::Value;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::ExportError;
use crate::models::{DataTable, cell_text};
use crate::template::ElementRef;
use crate::xml::{XmlError, XmlWriter};

const NS_OFFICE: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
const NS_STYLE: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";
const NS_TEXT: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
const NS_TABLE: &str = "urn:oasis:names:tc:opendocument:xmlns:table:1.0";
const NS_FO: &str = "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0";
const NS_META: &str = "urn:oasis:names:tc:opendocument:xmlns:meta:1.0";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_MANIFEST: &str = "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0";
const ODF_VERSION: &str = "1.2";
const PARAGRAPH_STYLE: &str = "Standard";

/// Kind of OpenDocument package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdfKind {
    Text,
    Spreadsheet,
}

impl OdfKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            OdfKind::Text => "application/vnd.oasis.opendocument.text",
            OdfKind::Spreadsheet => "application/vnd.oasis.opendocument.spreadsheet",
        }
    }

    fn body_tag(self) -> &'static str {
        match self {
            OdfKind::Text => "office:text",
            OdfKind::Spreadsheet => "office:spreadsheet",
        }
    }
}

/// Document metadata written to `meta.xml`
#[derive(Debug, Clone, Default)]
pub struct OdfMetadata {
    pub title: String,
    pub creator: String,
}

/// Writer for the `content.xml` part
pub struct OdfContentWriter {
    kind: OdfKind,
    writer: XmlWriter,
}

impl OdfContentWriter {
    pub fn new(kind: OdfKind) -> Result<Self, XmlError> {
        // Whitespace inside text:p is significant, so nothing is indented
        let mut writer = XmlWriter::compact();
        writer.declaration()?;
        writer.start(
            "office:document-content",
            &[
                ("xmlns:office", NS_OFFICE),
                ("xmlns:style", NS_STYLE),
                ("xmlns:text", NS_TEXT),
                ("xmlns:table", NS_TABLE),
                ("xmlns:fo", NS_FO),
                ("office:version", ODF_VERSION),
            ],
        )?;
        writer.start("office:body", &[])?;
        writer.start(kind.body_tag(), &[])?;
        Ok(Self { kind, writer })
    }

    pub fn paragraph(&mut self, text: &str) -> Result<&mut Self, XmlError> {
        self.writer
            .text_element("text:p", &[("text:style-name", PARAGRAPH_STYLE)], text)?;
        Ok(self)
    }

    /// Write `table` as a header row followed by its data rows
    ///
    /// With `typed_cells`, numeric values become float cells.
    pub fn table(&mut self, name: &str, table: &DataTable, typed_cells: bool) -> Result<&mut Self, XmlError> {
        let columns = table.columns.len().max(1).to_string();
        let header_rows = self.kind == OdfKind::Text;

        self.writer.start("table:table", &[("table:name", name)])?;
        self.writer.empty(
            "table:table-column",
            &[("table:number-columns-repeated", columns.as_str())],
        )?;

        if header_rows {
            self.writer.start("table:table-header-rows", &[])?;
        }
        self.writer.start("table:table-row", &[])?;
        for column in table.column_names() {
            self.string_cell(column)?;
        }
        self.writer.end("table:table-row")?;
        if header_rows {
            self.writer.end("table:table-header-rows")?;
        }

        for row in &table.rows {
            self.writer.start("table:table-row", &[])?;
            for ordinal in 0..table.columns.len() {
                match row.get(ordinal) {
                    Some(Value::Number(n)) if typed_cells => self.float_cell(&n.to_string())?,
                    Some(value) => self.string_cell(&cell_text(value))?,
                    None => self.string_cell("")?,
                };
            }
            self.writer.end("table:table-row")?;
        }

        self.writer.end("table:table")?;
        Ok(self)
    }

    fn string_cell(&mut self, text: &str) -> Result<&mut Self, XmlError> {
        self.writer
            .start("table:table-cell", &[("office:value-type", "string")])?;
        self.paragraph(text)?;
        self.writer.end("table:table-cell")?;
        Ok(self)
    }

    fn float_cell(&mut self, number: &str) -> Result<&mut Self, XmlError> {
        self.writer.start(
            "table:table-cell",
            &[("office:value-type", "float"), ("office:value", number)],
        )?;
        self.paragraph(number)?;
        self.writer.end("table:table-cell")?;
        Ok(self)
    }

    pub fn finish(mut self) -> Result<Vec<u8>, XmlError> {
        self.writer.end(self.kind.body_tag())?;
        self.writer.end("office:body")?;
        self.writer.end("office:document-content")?;
        Ok(self.writer.into_bytes())
    }
}

/// Visit the subtree of `element` children first, with nesting levels
pub fn walk_post_order<'a, F>(element: ElementRef<'a>, level: usize, visit: &mut F) -> Result<(), ExportError>
where
    F: FnMut(ElementRef<'a>, usize) -> Result<(), ExportError>,
{
    if element.supports_children() {
        for child in element.child_elements() {
            walk_post_order(child, level + 1, visit)?;
        }
    }
    visit(element, level)
}

/// Assemble a complete package around `content`
pub fn build_package(
    kind: OdfKind,
    content: &[u8],
    metadata: &OdfMetadata,
    temp_dir: Option<&Path>,
) -> Result<Vec<u8>, ExportError> {
    let file = match temp_dir {
        Some(dir) => tempfile::tempfile_in(dir)?,
        None => tempfile::tempfile()?,
    };

    let mut zip = ZipWriter::new(file);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(kind.mime_type().as_bytes())?;

    zip.start_file("META-INF/manifest.xml", deflated)?;
    zip.write_all(&manifest_xml(kind)?)?;

    zip.start_file("content.xml", deflated)?;
    zip.write_all(content)?;

    zip.start_file("styles.xml", deflated)?;
    zip.write_all(&styles_xml()?)?;

    zip.start_file("meta.xml", deflated)?;
    zip.write_all(&meta_xml(metadata)?)?;

    let mut file = zip.finish()?;
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    debug!(mime_type = kind.mime_type(), bytes = bytes.len(), "Built OpenDocument package");
    Ok(bytes)
}

fn manifest_xml(kind: OdfKind) -> Result<Vec<u8>, XmlError> {
    let mut writer = XmlWriter::new();
    writer.declaration()?;
    writer.start(
        "manifest:manifest",
        &[("xmlns:manifest", NS_MANIFEST), ("manifest:version", ODF_VERSION)],
    )?;
    writer.empty(
        "manifest:file-entry",
        &[
            ("manifest:full-path", "/"),
            ("manifest:version", ODF_VERSION),
            ("manifest:media-type", kind.mime_type()),
        ],
    )?;
    for part in ["content.xml", "styles.xml", "meta.xml"] {
        writer.empty(
            "manifest:file-entry",
            &[("manifest:full-path", part), ("manifest:media-type", "text/xml")],
        )?;
    }
    writer.end("manifest:manifest")?;
    Ok(writer.into_bytes())
}

fn styles_xml() -> Result<Vec<u8>, XmlError> {
    let mut writer = XmlWriter::new();
    writer.declaration()?;
    writer.start(
        "office:document-styles",
        &[
            ("xmlns:office", NS_OFFICE),
            ("xmlns:style", NS_STYLE),
            ("xmlns:fo", NS_FO),
            ("office:version", ODF_VERSION),
        ],
    )?;
    writer.start("office:styles", &[])?;
    writer.empty(
        "style:style",
        &[("style:name", PARAGRAPH_STYLE), ("style:family", "paragraph")],
    )?;
    writer.end("office:styles")?;
    writer.end("office:document-styles")?;
    Ok(writer.into_bytes())
}

fn meta_xml(metadata: &OdfMetadata) -> Result<Vec<u8>, XmlError> {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let generator = format!("report-composer/{}", env!("CARGO_PKG_VERSION"));

    let mut writer = XmlWriter::new();
    writer.declaration()?;
    writer.start(
        "office:document-meta",
        &[
            ("xmlns:office", NS_OFFICE),
            ("xmlns:meta", NS_META),
            ("xmlns:dc", NS_DC),
            ("office:version", ODF_VERSION),
        ],
    )?;
    writer.start("office:meta", &[])?;
    writer.text_element("meta:generator", &[], &generator)?;
    writer.text_element("dc:title", &[], &metadata.title)?;
    writer.text_element("meta:initial-creator", &[], &metadata.creator)?;
    writer.text_element("dc:creator", &[], &metadata.creator)?;
    writer.text_element("meta:creation-date", &[], &now)?;
    writer.text_element("dc:date", &[], &now)?;
    writer.end("office:meta")?;
    writer.end("office:document-meta")?;
    Ok(writer.into_bytes())
}
