use super::arena::XmlDocument;
use super::node::XmlNodeData;
use super::xname::{XAttribute, XName};
use crate::error::{DeckMergeError, Result};
use indextree::NodeId;
use roxmltree::NodeType;

pub fn parse(xml: &str) -> Result<XmlDocument> {
    parse_bytes(xml.as_bytes())
}

pub fn parse_bytes(bytes: &[u8]) -> Result<XmlDocument> {
    // Some producers emit a UTF-8 BOM in front of the declaration.
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| DeckMergeError::XmlParse {
        message: e.to_string(),
        location: "input".to_string(),
    })?;
    let doc = roxmltree::Document::parse_with_options(
        text,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| DeckMergeError::XmlParse {
        message: e.to_string(),
        location: format!("line {}", e.pos().row),
    })?;

    let mut xml_doc = XmlDocument::new();
    copy_node(doc.root_element(), &mut xml_doc, None);
    Ok(xml_doc)
}

fn copy_node(node: roxmltree::Node, doc: &mut XmlDocument, parent: Option<NodeId>) {
    let data = match node.node_type() {
        NodeType::Element => element_data(node),
        NodeType::Text => XmlNodeData::text(node.text().unwrap_or_default()),
        NodeType::Comment => XmlNodeData::Comment(node.text().unwrap_or_default().to_string()),
        NodeType::PI => match node.pi() {
            Some(pi) => XmlNodeData::ProcessingInstruction {
                target: pi.target.to_string(),
                data: pi.value.unwrap_or_default().to_string(),
            },
            None => return,
        },
        NodeType::Root => return,
    };
    let id = match parent {
        Some(parent) => doc.add_child(parent, data),
        None => doc.add_root(data),
    };
    for child in node.children() {
        copy_node(child, doc, Some(id));
    }
}

fn qualified(namespace: Option<&str>, local: &str) -> XName {
    XName::new(namespace.unwrap_or(""), local)
}

fn element_data(node: roxmltree::Node) -> XmlNodeData {
    let tag = node.tag_name();
    let mut attributes: Vec<XAttribute> = node
        .attributes()
        .map(|attr| XAttribute::new(qualified(attr.namespace(), attr.name()), attr.value()))
        .collect();

    // roxmltree lists every namespace in scope; only declarations this
    // element introduces become xmlns attributes.
    let in_parent = |prefix: Option<&str>, uri: &str| {
        node.parent_element()
            .is_some_and(|p| p.namespaces().any(|ns| ns.name() == prefix && ns.uri() == uri))
    };
    attributes.extend(
        node.namespaces()
            .filter(|ns| !in_parent(ns.name(), ns.uri()))
            .map(|ns| {
                let name = ns.name().map_or_else(|| XName::local("xmlns"), XName::xmlns);
                XAttribute::new(name, ns.uri())
            }),
    );

    XmlNodeData::element_with_attrs(qualified(tag.namespace(), tag.name()), attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_presentation_namespaces() {
        let xml = r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"
            xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
            <p:cSld><p:spTree/></p:cSld>
        </p:sld>"#;

        let doc = parse(xml).unwrap();
        let root = doc.root().unwrap();
        assert!(doc
            .name(root)
            .unwrap()
            .is("http://schemas.openxmlformats.org/presentationml/2006/main", "sld"));
        assert_eq!(
            doc.attribute(root, &XName::xmlns("a")),
            Some("http://schemas.openxmlformats.org/drawingml/2006/main")
        );
    }

    #[test]
    fn inherited_namespaces_are_not_redeclared() {
        let xml = r#"<a:r xmlns:a="urn:a"><a:c xmlns:b="urn:b"/></a:r>"#;
        let doc = parse(xml).unwrap();
        let root = doc.root().unwrap();
        let child = doc.find_child(root, &XName::new("urn:a", "c")).unwrap();
        let decls: Vec<_> = doc
            .get(child)
            .unwrap()
            .attributes()
            .unwrap()
            .iter()
            .filter(|a| a.name.is_namespace_declaration())
            .map(|a| a.value.clone())
            .collect();
        assert_eq!(decls, vec!["urn:b".to_string()]);
    }

    #[test]
    fn parse_preserves_attribute_order() {
        let xml = r#"<root a="1" b="2" c="3" d="4"/>"#;
        let doc = parse(xml).unwrap();

        let root_id = doc.root().unwrap();
        let attrs = doc.get(root_id).unwrap().attributes().unwrap();

        let names: Vec<_> = attrs.iter().map(|a| a.name.local_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<root/>");
        assert!(parse_bytes(&bytes).unwrap().root().is_some());
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse("<root><open></root>").unwrap_err();
        assert_eq!(err.code(), "DM010");
    }
}
