use super::node::XmlNodeData;
use super::xname::{XAttribute, XName};
use indextree::{Arena, NodeId};
use std::collections::HashSet;

/// Mutable XML tree backed by an indextree arena.
///
/// Node ids stay valid until the node (or an ancestor) is removed, so callers
/// collect ids into a `Vec` before mutating while iterating.
#[derive(Clone, Debug, Default)]
pub struct XmlDocument {
    arena: Arena<XmlNodeData>,
    root: Option<NodeId>,
}

/// Detached copy of a subtree, used to move nodes between (or within) documents.
#[derive(Clone, Debug)]
struct Snapshot {
    data: XmlNodeData,
    children: Vec<Snapshot>,
}

enum Placement {
    Append(NodeId),
    After(NodeId),
    Before(NodeId),
}

impl XmlDocument {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&XmlNodeData> {
        let node = self.arena.get(id)?;
        if node.is_removed() {
            return None;
        }
        Some(node.get())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut XmlNodeData> {
        let node = self.arena.get_mut(id)?;
        if node.is_removed() {
            return None;
        }
        Some(node.get_mut())
    }

    pub fn add_root(&mut self, data: XmlNodeData) -> NodeId {
        let id = self.arena.new_node(data);
        self.root = Some(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, data: XmlNodeData) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    pub fn add_before(&mut self, sibling: NodeId, data: XmlNodeData) -> NodeId {
        let new_node = self.arena.new_node(data);
        sibling.insert_before(new_node, &mut self.arena);
        new_node
    }

    pub fn add_after(&mut self, sibling: NodeId, data: XmlNodeData) -> NodeId {
        let new_node = self.arena.new_node(data);
        sibling.insert_after(new_node, &mut self.arena);
        new_node
    }

    /// Removes `node` together with all of its descendants.
    pub fn remove(&mut self, node: NodeId) {
        if Some(node) == self.root {
            self.root = None;
        }
        node.remove_subtree(&mut self.arena);
    }

    /// Moves an existing node so it becomes the last child of `parent`.
    pub fn move_to_end(&mut self, node: NodeId, parent: NodeId) {
        node.detach(&mut self.arena);
        parent.append(node, &mut self.arena);
    }

    /// Moves an existing node so it sits directly before `sibling`.
    pub fn move_before(&mut self, node: NodeId, sibling: NodeId) {
        node.detach(&mut self.arena);
        sibling.insert_before(node, &mut self.arena);
    }

    /// Sets or replaces an attribute; non-element nodes are left alone.
    pub fn set_attribute(&mut self, node: NodeId, name: &XName, value: &str) {
        let Some(attrs) = self.attrs_mut(node) else {
            return;
        };
        match attrs.iter_mut().find(|a| a.name == *name) {
            Some(existing) => existing.value = value.to_string(),
            None => attrs.push(XAttribute::new(name.clone(), value)),
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &XName) {
        if let Some(attrs) = self.attrs_mut(node) {
            attrs.retain(|a| a.name != *name);
        }
    }

    fn attrs_mut(&mut self, node: NodeId) -> Option<&mut Vec<XAttribute>> {
        self.get_mut(node)?.attributes_mut()
    }

    pub fn attribute(&self, node: NodeId, name: &XName) -> Option<&str> {
        self.get(node)?.attribute(name)
    }

    /// Attribute lookup for un-namespaced attributes such as `id`, `name` or `type`.
    pub fn local_attribute(&self, node: NodeId, local_name: &str) -> Option<&str> {
        self.get(node)?
            .attributes()?
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    pub fn name(&self, node: NodeId) -> Option<&XName> {
        self.get(node)?.name()
    }

    pub fn is(&self, node: NodeId, name: &XName) -> bool {
        self.name(node) == Some(name)
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        parent.children(&self.arena)
    }

    pub fn element_children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent)
            .filter(move |&c| self.get(c).map(|d| d.is_element()).unwrap_or(false))
    }

    /// Depth-first walk starting with `node` itself.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.descendants(&self.arena)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent()
    }

    /// Walk from `node` (inclusive) up to the root.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.ancestors(&self.arena)
    }

    pub fn elements_by_name<'a>(
        &'a self,
        parent: NodeId,
        name: &'a XName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent).filter(move |&child_id| {
            self.get(child_id)
                .and_then(|data| data.name())
                .map(|n| n == name)
                .unwrap_or(false)
        })
    }

    pub fn find_child(&self, parent: NodeId, name: &XName) -> Option<NodeId> {
        self.elements_by_name(parent, name).next()
    }

    /// First descendant (excluding `node`) with the given name, in document order.
    pub fn find_descendant(&self, node: NodeId, name: &XName) -> Option<NodeId> {
        self.descendants(node)
            .skip(1)
            .find(|&d| self.is(d, name))
    }

    pub fn descendants_named(&self, node: NodeId, name: &XName) -> Vec<NodeId> {
        self.descendants(node).filter(|&d| self.is(d, name)).collect()
    }

    /// Follows a chain of child element names, e.g. `[cSld, spTree]`.
    pub fn find_path(&self, start: NodeId, path: &[XName]) -> Option<NodeId> {
        path.iter()
            .try_fold(start, |current, name| self.find_child(current, name))
    }

    pub fn get_or_add_child(&mut self, parent: NodeId, name: &XName) -> NodeId {
        match self.find_child(parent, name) {
            Some(existing) => existing,
            None => self.add_child(parent, XmlNodeData::element(name.clone())),
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self, node: NodeId) -> String {
        self.descendants(node)
            .filter_map(|d| self.get(d).and_then(|data| data.text_content()))
            .collect()
    }

    /// Replaces all children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let children: Vec<_> = self.children(node).collect();
        for child in children {
            self.remove(child);
        }
        self.add_child(node, XmlNodeData::text(text));
    }

    /// Namespace declarations visible at `node`, nearest declaration first.
    pub fn namespaces_in_scope(&self, node: NodeId) -> Vec<XAttribute> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for ancestor in self.ancestors(node) {
            let Some(attrs) = self.get(ancestor).and_then(|d| d.attributes()) else {
                continue;
            };
            for attr in attrs {
                if attr.name.is_namespace_declaration() && seen.insert(attr.name.clone()) {
                    result.push(attr.clone());
                }
            }
        }
        result
    }

    /// Declares `prefix` on the root element unless `uri` is already in scope there.
    pub fn ensure_root_namespace(&mut self, prefix: &str, uri: &str) {
        let Some(root) = self.root else {
            return;
        };
        if self.namespaces_in_scope(root).iter().any(|a| a.value == uri) {
            return;
        }
        self.set_attribute(root, &XName::xmlns(prefix), uri);
    }

    /// Appends a deep copy of `source_node` (from `source`) under `parent`.
    pub fn copy_subtree_into(
        &mut self,
        source: &XmlDocument,
        source_node: NodeId,
        parent: NodeId,
    ) -> Option<NodeId> {
        let snapshot = source.snapshot(source_node)?;
        let declarations = source.namespaces_in_scope(source_node);
        let copied = self.materialize(snapshot, Placement::Append(parent));
        self.declare_missing_namespaces(copied, &declarations);
        Some(copied)
    }

    /// Inserts a deep copy of `source_node` directly after `sibling`.
    pub fn copy_subtree_after(
        &mut self,
        source: &XmlDocument,
        source_node: NodeId,
        sibling: NodeId,
    ) -> Option<NodeId> {
        let snapshot = source.snapshot(source_node)?;
        let declarations = source.namespaces_in_scope(source_node);
        let copied = self.materialize(snapshot, Placement::After(sibling));
        self.declare_missing_namespaces(copied, &declarations);
        Some(copied)
    }

    /// Inserts a deep copy of `source_node` directly before `sibling`.
    pub fn copy_subtree_before(
        &mut self,
        source: &XmlDocument,
        source_node: NodeId,
        sibling: NodeId,
    ) -> Option<NodeId> {
        let snapshot = source.snapshot(source_node)?;
        let declarations = source.namespaces_in_scope(source_node);
        let copied = self.materialize(snapshot, Placement::Before(sibling));
        self.declare_missing_namespaces(copied, &declarations);
        Some(copied)
    }

    /// Duplicates a node of this document and places the copy right after it.
    pub fn duplicate_after(&mut self, node: NodeId) -> Option<NodeId> {
        let snapshot = self.snapshot(node)?;
        Some(self.materialize(snapshot, Placement::After(node)))
    }

    fn snapshot(&self, node: NodeId) -> Option<Snapshot> {
        let data = self.get(node)?.clone();
        let children = self
            .children(node)
            .filter_map(|child| self.snapshot(child))
            .collect();
        Some(Snapshot { data, children })
    }

    fn materialize(&mut self, snapshot: Snapshot, placement: Placement) -> NodeId {
        let id = match placement {
            Placement::Append(parent) => self.add_child(parent, snapshot.data),
            Placement::After(sibling) => self.add_after(sibling, snapshot.data),
            Placement::Before(sibling) => self.add_before(sibling, snapshot.data),
        };
        for child in snapshot.children {
            self.materialize(child, Placement::Append(id));
        }
        id
    }

    fn declare_missing_namespaces(&mut self, node: NodeId, declarations: &[XAttribute]) {
        let in_scope: HashSet<String> = self
            .namespaces_in_scope(node)
            .into_iter()
            .map(|a| a.value)
            .collect();
        for decl in declarations {
            if !in_scope.contains(&decl.value) {
                self.set_attribute(node, &decl.name, &decl.value);
            }
        }
    }
}
