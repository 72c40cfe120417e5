//! Arena tree back to XML bytes with quick-xml.
//!
//! Prefixes come from the `xmlns` declarations in scope at each element; a
//! namespace nobody declared falls back to its conventional OOXML prefix.

use super::arena::XmlDocument;
use super::node::XmlNodeData;
use super::xname::{XAttribute, XName, XMLNS_NS};
use crate::error::{DeckMergeError, Result};
use indextree::NodeId;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Cursor;

pub fn serialize(doc: &XmlDocument) -> Result<String> {
    String::from_utf8(serialize_bytes(doc)?).map_err(write_error)
}

/// The whole document with a standalone UTF-8 declaration, as stored in a part.
pub fn serialize_bytes(doc: &XmlDocument) -> Result<Vec<u8>> {
    let mut serializer = Serializer {
        doc,
        writer: Writer::new(Cursor::new(Vec::new())),
        scopes: Vec::new(),
    };
    serializer.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    if let Some(root) = doc.root() {
        serializer.node(root)?;
    }
    Ok(serializer.writer.into_inner().into_inner())
}

fn write_error(e: impl std::fmt::Display) -> DeckMergeError {
    DeckMergeError::XmlWrite(e.to_string())
}

struct Serializer<'d> {
    doc: &'d XmlDocument,
    writer: Writer<Cursor<Vec<u8>>>,
    /// Namespace URI to prefix, one map per open element that declares any.
    scopes: Vec<HashMap<String, String>>,
}

impl Serializer<'_> {
    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(write_error)
    }

    fn declared_prefix(&self, namespace: &str, allow_default: bool) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .filter_map(|scope| scope.get(namespace))
            .map(String::as_str)
            .find(|prefix| allow_default || !prefix.is_empty())
    }

    fn qualify(&self, name: &XName, is_attribute: bool) -> String {
        let Some(ns) = &name.namespace else {
            return name.local_name.clone();
        };
        let prefix = if ns == XMLNS_NS {
            "xmlns"
        } else {
            // attributes never take the default namespace
            self.declared_prefix(ns, !is_attribute)
                .unwrap_or_else(|| conventional_prefix(ns))
        };
        if prefix.is_empty() {
            name.local_name.clone()
        } else {
            format!("{prefix}:{}", name.local_name)
        }
    }

    fn node(&mut self, id: NodeId) -> Result<()> {
        let doc = self.doc;
        match doc.get(id) {
            Some(XmlNodeData::Element { name, attributes }) => self.element(id, name, attributes),
            Some(XmlNodeData::Text(text)) => self.emit(Event::Text(BytesText::new(text))),
            Some(XmlNodeData::CData(text)) => self.emit(Event::CData(BytesCData::new(text))),
            Some(XmlNodeData::Comment(text)) => self.emit(Event::Comment(BytesText::new(text))),
            Some(XmlNodeData::ProcessingInstruction { target, data }) => {
                let content = if data.is_empty() {
                    target.clone()
                } else {
                    format!("{target} {data}")
                };
                self.emit(Event::PI(BytesPI::new(&content)))
            }
            None => Ok(()),
        }
    }

    fn element(&mut self, id: NodeId, name: &XName, attributes: &[XAttribute]) -> Result<()> {
        let scope: HashMap<String, String> = attributes
            .iter()
            .filter_map(|attr| match &attr.name.namespace {
                Some(ns) if ns == XMLNS_NS => Some((attr.value.clone(), attr.name.local_name.clone())),
                None if attr.name.local_name == "xmlns" => Some((attr.value.clone(), String::new())),
                _ => None,
            })
            .collect();
        let pushed = !scope.is_empty();
        if pushed {
            self.scopes.push(scope);
        }

        let tag = self.qualify(name, false);
        let mut start = BytesStart::new(tag.as_str());
        for attr in attributes {
            let attr_name = self.qualify(&attr.name, true);
            start.push_attribute((attr_name.as_str(), attr.value.as_str()));
        }

        let doc = self.doc;
        let mut children = doc.children(id).peekable();
        if children.peek().is_none() {
            self.emit(Event::Empty(start))?;
        } else {
            self.emit(Event::Start(start))?;
            for child in children {
                self.node(child)?;
            }
            self.emit(Event::End(BytesEnd::new(tag.as_str())))?;
        }

        if pushed {
            self.scopes.pop();
        }
        Ok(())
    }
}

fn conventional_prefix(namespace: &str) -> &'static str {
    match namespace {
        "http://schemas.openxmlformats.org/presentationml/2006/main" => "p",
        "http://schemas.microsoft.com/office/powerpoint/2010/main" => "p14",
        "http://schemas.openxmlformats.org/drawingml/2006/main" => "a",
        "http://schemas.openxmlformats.org/drawingml/2006/chart" => "c",
        "http://schemas.microsoft.com/office/drawing/2014/main" => "a16",
        "http://schemas.openxmlformats.org/spreadsheetml/2006/main" => "x",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships" => "r",
        "http://schemas.openxmlformats.org/markup-compatibility/2006" => "mc",
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties" => "cp",
        "http://purl.org/dc/elements/1.1/" => "dc",
        "http://purl.org/dc/terms/" => "dcterms",
        "http://www.w3.org/2001/XMLSchema-instance" => "xsi",
        "http://www.w3.org/XML/1998/namespace" => "xml",
        _ => "ns",
    }
}
