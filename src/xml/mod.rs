//! XML reading and writing helpers over `quick-xml`
//!
//! [`XmlNode::parse`] reads a document into a small owned node tree, which is
//! all the template serializer needs. [`XmlWriter`] wraps the streaming
//! writer used by the serializer and the XHTML and ODF exporters.

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

/// Errors raised while reading or writing XML
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("XML parsing error at position {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("XML write error: {0}")]
    Write(String),

    #[error("Unbalanced XML: {0}")]
    Unbalanced(String),

    #[error("Document has no root element")]
    Empty,
}

/// Element of a parsed XML document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Local name, without namespace prefix
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Concatenated text and CDATA content directly inside this element
    pub text: String,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<XmlNode, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            let parse_err = |message: String, position: u64| XmlError::Parse { position, message };
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    stack.push(Self::from_start(e).map_err(|m| parse_err(m, reader.buffer_position() as u64))?);
                }
                Ok(Event::Empty(ref e)) => {
                    let node = Self::from_start(e).map_err(|m| parse_err(m, reader.buffer_position() as u64))?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    let node = stack
                        .pop()
                        .ok_or_else(|| XmlError::Unbalanced(format!("unexpected </{name}>")))?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::Text(ref t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| parse_err(e.to_string(), reader.buffer_position() as u64))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(ref c)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(c));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(XmlError::Parse {
                        position: reader.error_position() as u64,
                        message: e.to_string(),
                    });
                }
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(XmlError::Unbalanced(format!("<{}> is never closed", open.name)));
        }
        root.ok_or(XmlError::Empty)
    }

    fn from_start(e: &BytesStart<'_>) -> Result<XmlNode, String> {
        let mut node = XmlNode::new(String::from_utf8_lossy(e.local_name().as_ref()));
        for attr in e.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            node.attributes.push((key, value.into_owned()));
        }
        Ok(node)
    }

    fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<(), XmlError> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(node);
                Ok(())
            }
            None if root.is_none() => {
                *root = Some(node);
                Ok(())
            }
            None => Err(XmlError::Unbalanced(format!(
                "second root element <{}>",
                node.name
            ))),
        }
    }

    /// Attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Child elements with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child element with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }
}

/// Streaming XML writer producing an in-memory document
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    /// Writer indenting nested elements by two spaces
    pub fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    /// Writer without indentation, for formats sensitive to whitespace
    pub fn compact() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<&mut Self, XmlError> {
        self.writer
            .write_event(event)
            .map_err(|e| XmlError::Write(e.to_string()))?;
        Ok(self)
    }

    pub fn declaration(&mut self) -> Result<&mut Self, XmlError> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    pub fn doctype(&mut self, doctype: &str) -> Result<&mut Self, XmlError> {
        self.write(Event::DocType(BytesText::from_escaped(doctype)))
    }

    /// Open an element
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<&mut Self, XmlError> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attributes {
            start.push_attribute((key, value));
        }
        self.write(Event::Start(start))
    }

    pub fn end(&mut self, name: &str) -> Result<&mut Self, XmlError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Write a self-closing element
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<&mut Self, XmlError> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attributes {
            start.push_attribute((key, value));
        }
        self.write(Event::Empty(start))
    }

    /// Write escaped text
    pub fn text(&mut self, text: &str) -> Result<&mut Self, XmlError> {
        self.write(Event::Text(BytesText::new(text)))
    }

    /// Write text as CDATA, splitting it into several sections around any
    /// `]]>` terminator so surrounding whitespace survives a reload
    pub fn cdata(&mut self, text: &str) -> Result<&mut Self, XmlError> {
        let mut rest = text;
        while let Some(index) = rest.find("]]>") {
            // Keep "]]" in this section and start the next one with ">"
            let (head, tail) = rest.split_at(index + 2);
            self.write(Event::CData(BytesCData::new(Cow::Borrowed(head))))?;
            rest = tail;
        }
        self.write(Event::CData(BytesCData::new(Cow::Borrowed(rest))))
    }

    /// Element holding only text
    pub fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<&mut Self, XmlError> {
        self.start(name, attributes)?;
        if !text.is_empty() {
            self.text(text)?;
        }
        self.end(name)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let xml = r#"<?xml version="1.0"?>
            <root a="1"><child name="x &amp; y">text</child><child/><![CDATA[<raw>]]></root>"#;
        let root = XmlNode::parse(xml).unwrap();

        assert_eq!(root.name, "root");
        assert_eq!(root.attribute("a"), Some("1"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].attribute("name"), Some("x & y"));
        assert_eq!(root.child_text("child"), Some("text"));
        assert_eq!(root.text, "<raw>");
        assert_eq!(root.children_named("child").count(), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(XmlNode::parse(""), Err(XmlError::Empty)));
        assert!(XmlNode::parse("<a><b></a>").is_err());
        assert!(matches!(
            XmlNode::parse("<a></a><b/>"),
            Err(XmlError::Unbalanced(_))
        ));
    }

    #[test]
    fn test_writer_escapes_and_roundtrips() {
        let mut writer = XmlWriter::compact();
        writer.start("doc", &[("title", "a \"quoted\" <title>")]).unwrap();
        writer.text_element("p", &[], "1 < 2 & 3").unwrap();
        writer.cdata("SELECT * FROM t WHERE a < 1").unwrap();
        writer.empty("hr", &[("class", "height-2")]).unwrap();
        writer.end("doc").unwrap();

        let xml = String::from_utf8(writer.into_bytes()).unwrap();
        assert!(xml.contains("<![CDATA[SELECT * FROM t WHERE a < 1]]>"));

        let root = XmlNode::parse(&xml).unwrap();
        assert_eq!(root.attribute("title"), Some("a \"quoted\" <title>"));
        assert_eq!(root.child_text("p"), Some("1 < 2 & 3"));
        assert_eq!(root.text, "SELECT * FROM t WHERE a < 1");
        assert_eq!(root.child("hr").and_then(|h| h.attribute("class")), Some("height-2"));
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        let mut writer = XmlWriter::compact();
        writer.start("v", &[]).unwrap();
        writer.cdata(" a]]>b ").unwrap();
        writer.end("v").unwrap();

        let xml = String::from_utf8(writer.into_bytes()).unwrap();
        assert_eq!(xml, "<v><![CDATA[ a]]]]><![CDATA[>b ]]></v>");
        assert_eq!(XmlNode::parse(&xml).unwrap().text, " a]]>b ");
    }
}
