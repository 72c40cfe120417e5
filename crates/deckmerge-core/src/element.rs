//! Addressing shapes inside a slide or master by name or creation id.

use crate::chart::{self, ChartParts};
use crate::error::{DeckMergeError, Result};
use crate::package::OoxmlPackage;
use crate::xml::namespaces::{A, A16, C, P, R};
use crate::xml::{XAttribute, XName, XmlDocument, XmlNodeData};
use indextree::NodeId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementSelector {
    /// `p:cNvPr/@name`; the first match in document order wins.
    Name(String),
    /// `a16:creationId/@id`, stable across edits that rename or move the shape.
    CreationId(String),
}

impl ElementSelector {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn creation_id(id: impl Into<String>) -> Self {
        Self::CreationId(id.into())
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "named '{name}'"),
            Self::CreationId(id) => write!(f, "with creation id {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Shape,
    Group,
    Picture,
    GraphicFrame,
    Connector,
    ContentPart,
}

impl ElementKind {
    fn of(name: &XName) -> Option<Self> {
        if *name == P::sp() {
            Some(Self::Shape)
        } else if *name == P::grpSp() {
            Some(Self::Group)
        } else if *name == P::pic() {
            Some(Self::Picture)
        } else if *name == P::graphicFrame() {
            Some(Self::GraphicFrame)
        } else if *name == P::cxnSp() {
            Some(Self::Connector)
        } else if *name == P::contentPart() {
            Some(Self::ContentPart)
        } else {
            None
        }
    }
}

/// One addressable element, as listed by [`list_elements`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementInfo {
    pub name: String,
    pub creation_id: Option<String>,
    pub kind: ElementKind,
    /// Number of enclosing group shapes.
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct ShapeNode {
    pub node: NodeId,
    pub info: ElementInfo,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Group membership of a shape tree, derived from the XML in one pass.
///
/// Read-only: it goes stale as soon as the document is edited.
#[derive(Debug, Clone, Default)]
pub struct ShapeTree {
    nodes: Vec<ShapeNode>,
}

impl ShapeTree {
    pub fn build(doc: &XmlDocument) -> Self {
        let mut tree = Self::default();
        let sp_tree = doc
            .root()
            .and_then(|root| doc.find_path(root, &[P::cSld(), P::spTree()]));
        if let Some(sp_tree) = sp_tree {
            tree.collect(doc, sp_tree, None, 0);
        }
        tree
    }

    fn collect(&mut self, doc: &XmlDocument, container: NodeId, parent: Option<usize>, depth: usize) {
        for child in doc.element_children(container) {
            let Some(kind) = doc.name(child).and_then(ElementKind::of) else {
                continue;
            };
            let c_nv_pr = non_visual_props(doc, child);
            let info = ElementInfo {
                name: c_nv_pr
                    .and_then(|n| doc.local_attribute(n, "name"))
                    .unwrap_or_default()
                    .to_string(),
                creation_id: c_nv_pr.and_then(|n| creation_id(doc, n)),
                kind,
                depth,
            };
            let index = self.nodes.len();
            self.nodes.push(ShapeNode {
                node: child,
                info,
                parent,
                children: Vec::new(),
            });
            if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
                p.children.push(index);
            }
            if kind == ElementKind::Group {
                self.collect(doc, child, Some(index), depth + 1);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShapeNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, selector: &ElementSelector) -> Option<&ShapeNode> {
        self.nodes.iter().find(|n| match selector {
            ElementSelector::Name(name) => &n.info.name == name,
            ElementSelector::CreationId(id) => n
                .info
                .creation_id
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(id))
                .unwrap_or(false),
        })
    }

    pub fn parent_of(&self, node: &ShapeNode) -> Option<&ShapeNode> {
        node.parent.and_then(|p| self.nodes.get(p))
    }

    pub fn children_of<'a>(&'a self, node: &'a ShapeNode) -> impl Iterator<Item = &'a ShapeNode> + 'a {
        node.children.iter().filter_map(|&c| self.nodes.get(c))
    }
}

/// The `p:cNvPr` of a shape-tree element.
fn non_visual_props(doc: &XmlDocument, element: NodeId) -> Option<NodeId> {
    let nv = doc.element_children(element).next()?;
    doc.find_child(nv, &P::cNvPr())
}

fn creation_id(doc: &XmlDocument, c_nv_pr: NodeId) -> Option<String> {
    let ext_lst = doc.find_child(c_nv_pr, &A::extLst())?;
    doc.elements_by_name(ext_lst, &A::ext())
        .filter(|&ext| doc.local_attribute(ext, "uri") == Some(A16::CREATION_ID_EXT_URI))
        .find_map(|ext| doc.find_child(ext, &A16::creationId()))
        .and_then(|id| doc.local_attribute(id, "id"))
        .map(str::to_string)
}

pub fn list_elements(doc: &XmlDocument) -> Vec<ElementInfo> {
    ShapeTree::build(doc).nodes.into_iter().map(|n| n.info).collect()
}

pub fn find_element(doc: &XmlDocument, part: &str, selector: &ElementSelector) -> Result<NodeId> {
    ShapeTree::build(doc)
        .find(selector)
        .map(|n| n.node)
        .ok_or_else(|| DeckMergeError::ElementNotFound {
            selector: selector.to_string(),
            part: part.to_string(),
        })
}

/// Gives every element without a creation id a fresh one and returns how many were added.
pub fn ensure_creation_ids(doc: &mut XmlDocument) -> usize {
    let missing: Vec<NodeId> = ShapeTree::build(doc)
        .iter()
        .filter(|n| n.info.creation_id.is_none())
        .filter_map(|n| non_visual_props(doc, n.node))
        .collect();
    if missing.is_empty() {
        return 0;
    }
    doc.ensure_root_namespace("a", A::NS);
    for &c_nv_pr in &missing {
        let id = format!("{{{}}}", uuid::Uuid::new_v4()).to_uppercase();
        let ext_lst = doc.get_or_add_child(c_nv_pr, &A::extLst());
        let ext = doc.add_child(
            ext_lst,
            XmlNodeData::element_with_attrs(
                A::ext(),
                vec![XAttribute::new(XName::local("uri"), A16::CREATION_ID_EXT_URI)],
            ),
        );
        doc.add_child(
            ext,
            XmlNodeData::element_with_attrs(
                A16::creationId(),
                vec![
                    XAttribute::new(XName::xmlns("a16"), A16::NS),
                    XAttribute::new(XName::local("id"), &id),
                ],
            ),
        );
    }
    missing.len()
}

/// Chart behind a graphic frame, if the frame holds one.
pub fn chart_of(pkg: &OoxmlPackage, part: &str, node: NodeId) -> Result<Option<ChartParts>> {
    let doc = pkg.xml(part)?;
    let rel_id = doc
        .descendants(node)
        .find(|&n| doc.is(n, &C::chart()))
        .and_then(|n| doc.attribute(n, &R::id()));
    let Some(chart_path) = rel_id.and_then(|id| pkg.target_of(part, id)) else {
        return Ok(None);
    };
    chart::chart_parts(pkg, &chart_path).map(Some)
}

/// A located element handed to modification callbacks.
///
/// The element is already attached: every relationship it uses resolves.
/// Callbacks may edit the XML freely but must not add relationship ids.
pub struct ElementHandle<'a> {
    part: &'a str,
    doc: &'a mut XmlDocument,
    node: NodeId,
    chart: Option<ChartParts>,
}

impl<'a> ElementHandle<'a> {
    pub fn new(part: &'a str, doc: &'a mut XmlDocument, node: NodeId, chart: Option<ChartParts>) -> Self {
        Self {
            part,
            doc,
            node,
            chart,
        }
    }

    pub fn part(&self) -> &str {
        self.part
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn doc(&self) -> &XmlDocument {
        self.doc
    }

    pub fn doc_mut(&mut self) -> &mut XmlDocument {
        self.doc
    }

    /// Chart and workbook parts when the element is a chart frame.
    pub fn chart(&self) -> Option<&ChartParts> {
        self.chart.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        non_visual_props(self.doc, self.node).and_then(|n| self.doc.local_attribute(n, "name"))
    }

    pub fn set_name(&mut self, name: &str) {
        if let Some(c_nv_pr) = non_visual_props(self.doc, self.node) {
            self.doc.set_attribute(c_nv_pr, &XName::local("name"), name);
        }
    }

    /// Replaces the text of the first run in the element's text body.
    pub fn set_text(&mut self, text: &str) -> bool {
        let run_text = self
            .doc
            .descendants(self.node)
            .find(|&n| self.doc.is(n, &A::t()));
        match run_text {
            Some(t) => {
                self.doc.set_text(t, text);
                true
            }
            None => false,
        }
    }
}
