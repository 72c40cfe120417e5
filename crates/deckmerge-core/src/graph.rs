//! Relationship-graph operations used while copying parts between packages.

use crate::error::{DeckMergeError, Result};
use crate::package::paths;
use crate::package::{OoxmlPackage, PartRole, Relationship};
use crate::xml::namespaces::{A, C, P};
use crate::xml::{XName, XmlDocument};
use indextree::NodeId;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

/// Elements that exist only to carry a relationship reference; they are
/// removed whole when their relationship goes away.
static REFERENCE_ONLY_ELEMENTS: Lazy<Vec<XName>> = Lazy::new(|| {
    vec![
        P::sldId(),
        P::sldMasterId(),
        P::sldLayoutId(),
        P::notesMasterId(),
        A::hlinkClick(),
        A::hlinkHover(),
        C::externalData(),
    ]
});

/// Copies relationship `rel_id` of `source_part` onto `dest_part` and returns the new id.
///
/// Internal targets are redirected through `target_map` (source path to
/// destination path); external targets are copied by value.
pub fn copy_relationship(
    source: &OoxmlPackage,
    source_part: &str,
    rel_id: &str,
    dest: &mut OoxmlPackage,
    dest_part: &str,
    target_map: &HashMap<String, String>,
) -> Result<String> {
    let rel = source
        .relationships(source_part)
        .and_then(|rels| rels.get(rel_id))
        .ok_or_else(|| DeckMergeError::UnresolvableRelationship {
            part: source_part.to_string(),
            rel_id: rel_id.to_string(),
            target: String::new(),
        })?;

    if rel.is_external() {
        return dest.add_external_relationship(dest_part, &rel.rel_type, &rel.target);
    }

    let source_target = paths::resolve_target(source_part, &rel.target);
    let dest_target = target_map.get(&source_target).ok_or_else(|| {
        DeckMergeError::UnresolvableRelationship {
            part: source_part.to_string(),
            rel_id: rel_id.to_string(),
            target: source_target.clone(),
        }
    })?;
    dest.add_relationship(dest_part, &rel.rel_type, dest_target)
}

/// Replaces relationship ids in every reference attribute of `doc`.
///
/// Each attribute is looked up once, so `{rId1: rId2, rId2: rId1}` swaps
/// rather than chains. Ids missing from `id_map` are left untouched.
pub fn rewrite_references(doc: &mut XmlDocument, role: PartRole, id_map: &HashMap<String, String>) -> usize {
    let Some(root) = doc.root() else {
        return 0;
    };
    let mut rewrites: Vec<(NodeId, XName, String)> = Vec::new();
    for node in doc.descendants(root) {
        for attr in role.reference_attributes() {
            if let Some(new_id) = doc.attribute(node, attr).and_then(|old| id_map.get(old)) {
                rewrites.push((node, attr.clone(), new_id.clone()));
            }
        }
    }
    for (node, attr, value) in &rewrites {
        doc.set_attribute(*node, attr, value);
    }
    rewrites.len()
}

/// Removes every reference to `ids` from `doc`.
///
/// Elements that only exist to hold the reference are dropped whole; on any
/// other element just the attribute is removed.
pub fn strip_references(doc: &mut XmlDocument, role: PartRole, ids: &[String]) -> usize {
    let Some(root) = doc.root() else {
        return 0;
    };
    let mut drop_nodes: Vec<NodeId> = Vec::new();
    let mut drop_attrs: Vec<(NodeId, XName)> = Vec::new();
    for node in doc.descendants(root) {
        for attr in role.reference_attributes() {
            let Some(value) = doc.attribute(node, attr) else {
                continue;
            };
            if !ids.iter().any(|id| id == value) {
                continue;
            }
            let reference_only = doc
                .name(node)
                .map(|n| REFERENCE_ONLY_ELEMENTS.contains(n))
                .unwrap_or(false);
            if reference_only {
                drop_nodes.push(node);
            } else {
                drop_attrs.push((node, attr.clone()));
            }
        }
    }

    let count = drop_nodes.len() + drop_attrs.len();
    for (node, attr) in drop_attrs {
        doc.remove_attribute(node, &attr);
    }
    for node in drop_nodes {
        // an ancestor may already have taken it
        if doc.get(node).is_some() {
            doc.remove(node);
        }
    }
    count
}

/// Every relationship id referenced from `doc` through the role's attribute allow-list.
pub fn referenced_ids(doc: &XmlDocument, role: PartRole) -> BTreeSet<String> {
    let Some(root) = doc.root() else {
        return BTreeSet::new();
    };
    let mut ids = BTreeSet::new();
    for node in doc.descendants(root) {
        for attr in role.reference_attributes() {
            if let Some(value) = doc.attribute(node, attr) {
                if !value.is_empty() {
                    ids.insert(value.to_string());
                }
            }
        }
    }
    ids
}

/// Relationships of `owner` whose type is illegal for `role`.
pub fn illegal_relationships<'a>(
    role: PartRole,
    rels: impl Iterator<Item = &'a Relationship>,
) -> Vec<&'a Relationship> {
    rels.filter(|r| !r.is_external() && !role.allows_child(&r.rel_type))
        .collect()
}
