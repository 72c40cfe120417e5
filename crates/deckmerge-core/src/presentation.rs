//! Bookkeeping in `presentation.xml` and master layout lists: the id lists
//! that register slides, masters and the notes master.

use crate::error::{DeckMergeError, Result};
use crate::package::relationships::relationship_types as rt;
use crate::package::OoxmlPackage;
use crate::xml::namespaces::{P, R};
use crate::xml::{XAttribute, XName, XmlDocument, XmlNodeData};
use indextree::NodeId;

/// Child order of `p:presentation` up to the size elements.
fn presentation_list_order() -> [XName; 6] {
    [
        P::sldMasterIdLst(),
        P::notesMasterIdLst(),
        P::handoutMasterIdLst(),
        P::sldIdLst(),
        P::sldSz(),
        P::notesSz(),
    ]
}

/// One `p:sldId` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideEntry {
    pub id: u32,
    pub rel_id: String,
    pub path: String,
}

fn root_of(doc: &XmlDocument, part: &str) -> Result<NodeId> {
    doc.root()
        .ok_or_else(|| DeckMergeError::malformed(format!("part '{part}' is empty")))
}

/// Finds or creates the list element `name` in its schema position under `root`.
fn ensure_list(doc: &mut XmlDocument, root: NodeId, name: &XName, order: &[XName]) -> NodeId {
    if let Some(existing) = doc.find_child(root, name) {
        return existing;
    }
    let position = order.iter().position(|n| n == name).unwrap_or(order.len());
    let follower = order
        .get(position + 1..)
        .unwrap_or_default()
        .iter()
        .find_map(|n| doc.find_child(root, n));
    match follower {
        Some(next) => doc.add_before(next, XmlNodeData::element(name.clone())),
        None => doc.add_child(root, XmlNodeData::element(name.clone())),
    }
}

fn numeric_id(doc: &XmlDocument, node: NodeId) -> Option<u32> {
    doc.local_attribute(node, "id")?.parse().ok()
}

/// Slides in presentation order.
pub fn slides(pkg: &OoxmlPackage) -> Result<Vec<SlideEntry>> {
    let pres_path = pkg.main_part_path()?;
    let doc = pkg.xml(&pres_path)?;
    let root = root_of(doc, &pres_path)?;
    let Some(list) = doc.find_child(root, &P::sldIdLst()) else {
        return Ok(Vec::new());
    };
    let mut entries = Vec::new();
    for node in doc.elements_by_name(list, &P::sldId()) {
        let rel_id = doc.attribute(node, &R::id()).unwrap_or_default().to_string();
        let path = pkg.target_of(&pres_path, &rel_id).ok_or_else(|| {
            DeckMergeError::UnresolvableRelationship {
                part: pres_path.clone(),
                rel_id: rel_id.clone(),
                target: String::new(),
            }
        })?;
        entries.push(SlideEntry {
            id: numeric_id(doc, node).unwrap_or_default(),
            rel_id,
            path,
        });
    }
    Ok(entries)
}

pub fn slide_paths(pkg: &OoxmlPackage) -> Result<Vec<String>> {
    Ok(slides(pkg)?.into_iter().map(|s| s.path).collect())
}

/// Registers `slide_path` at the end of the slide list and returns its slide id.
pub fn append_slide(pkg: &mut OoxmlPackage, slide_path: &str) -> Result<u32> {
    let pres_path = pkg.main_part_path()?;
    let used: Vec<u32> = slides(pkg)?.iter().map(|s| s.id).collect();
    let id = pkg.allocate_slide_id(used)?;
    let rel_id = pkg.add_relationship(&pres_path, rt::SLIDE, slide_path)?;

    let doc = pkg.xml_mut(&pres_path)?;
    doc.ensure_root_namespace("r", R::NS);
    let root = root_of(doc, &pres_path)?;
    let list = ensure_list(doc, root, &P::sldIdLst(), &presentation_list_order());
    doc.add_child(
        list,
        XmlNodeData::element_with_attrs(
            P::sldId(),
            vec![
                XAttribute::new(XName::local("id"), &id.to_string()),
                XAttribute::new(R::id(), &rel_id),
            ],
        ),
    );
    Ok(id)
}

/// Moves the slide at `from` so it ends up at index `to` (both zero-based).
pub fn move_slide(pkg: &mut OoxmlPackage, from: usize, to: usize) -> Result<()> {
    let pres_path = pkg.main_part_path()?;
    let doc = pkg.xml_mut(&pres_path)?;
    let root = root_of(doc, &pres_path)?;
    let list = doc
        .find_child(root, &P::sldIdLst())
        .ok_or_else(|| DeckMergeError::missing_part(format!("slide {}", from + 1)))?;
    let entries: Vec<NodeId> = doc.elements_by_name(list, &P::sldId()).collect();
    if from >= entries.len() || to >= entries.len() {
        return Err(DeckMergeError::missing_part(format!(
            "slide {}",
            from.max(to) + 1
        )));
    }
    if from == to {
        return Ok(());
    }
    let moving = entries[from];
    let remaining: Vec<NodeId> = entries.into_iter().filter(|&n| n != moving).collect();
    match remaining.get(to) {
        Some(&anchor) => doc.move_before(moving, anchor),
        None => doc.move_to_end(moving, list),
    }
    Ok(())
}

/// Slide masters in `p:sldMasterIdLst` order.
pub fn master_paths(pkg: &OoxmlPackage) -> Result<Vec<String>> {
    let pres_path = pkg.main_part_path()?;
    let doc = pkg.xml(&pres_path)?;
    let root = root_of(doc, &pres_path)?;
    let Some(list) = doc.find_child(root, &P::sldMasterIdLst()) else {
        return Ok(Vec::new());
    };
    Ok(doc
        .elements_by_name(list, &P::sldMasterId())
        .filter_map(|n| doc.attribute(n, &R::id()))
        .filter_map(|rel_id| pkg.target_of(&pres_path, rel_id))
        .collect())
}

/// Layouts of a master in `p:sldLayoutIdLst` order.
pub fn layout_paths(pkg: &OoxmlPackage, master_path: &str) -> Result<Vec<String>> {
    let doc = pkg.xml(master_path)?;
    let root = root_of(doc, master_path)?;
    let Some(list) = doc.find_child(root, &P::sldLayoutIdLst()) else {
        return Ok(Vec::new());
    };
    Ok(doc
        .elements_by_name(list, &P::sldLayoutId())
        .filter_map(|n| doc.attribute(n, &R::id()))
        .filter_map(|rel_id| pkg.target_of(master_path, rel_id))
        .collect())
}

/// All master and layout ids in use; they share one number space.
pub fn used_master_layout_ids(pkg: &OoxmlPackage) -> Result<Vec<u32>> {
    let mut used = Vec::new();
    let pres_path = pkg.main_part_path()?;
    let pres = pkg.xml(&pres_path)?;
    let pres_root = root_of(pres, &pres_path)?;
    used.extend(
        pres.descendants_named(pres_root, &P::sldMasterId())
            .into_iter()
            .filter_map(|n| numeric_id(pres, n)),
    );
    for master in master_paths(pkg)? {
        let doc = pkg.xml(&master)?;
        let root = root_of(doc, &master)?;
        used.extend(
            doc.descendants_named(root, &P::sldLayoutId())
                .into_iter()
                .filter_map(|n| numeric_id(doc, n)),
        );
    }
    Ok(used)
}

/// Registers an imported master in `p:sldMasterIdLst` and gives its layout
/// entries ids that are unique in this presentation.
pub fn register_master(pkg: &mut OoxmlPackage, master_path: &str) -> Result<u32> {
    let pres_path = pkg.main_part_path()?;
    let mut used = used_master_layout_ids(pkg)?;
    let master_id = pkg.allocate_master_layout_id(used.iter().copied())?;
    used.push(master_id);

    let layout_nodes: Vec<NodeId> = {
        let doc = pkg.xml(master_path)?;
        let root = root_of(doc, master_path)?;
        doc.descendants_named(root, &P::sldLayoutId())
    };
    let mut layout_ids = Vec::with_capacity(layout_nodes.len());
    for _ in &layout_nodes {
        let id = pkg.allocate_master_layout_id(used.iter().copied())?;
        used.push(id);
        layout_ids.push(id);
    }
    let doc = pkg.xml_mut(master_path)?;
    for (node, id) in layout_nodes.into_iter().zip(layout_ids) {
        doc.set_attribute(node, &XName::local("id"), &id.to_string());
    }

    let rel_id = pkg.add_relationship(&pres_path, rt::SLIDE_MASTER, master_path)?;
    let doc = pkg.xml_mut(&pres_path)?;
    doc.ensure_root_namespace("r", R::NS);
    let root = root_of(doc, &pres_path)?;
    let list = ensure_list(doc, root, &P::sldMasterIdLst(), &presentation_list_order());
    doc.add_child(
        list,
        XmlNodeData::element_with_attrs(
            P::sldMasterId(),
            vec![
                XAttribute::new(XName::local("id"), &master_id.to_string()),
                XAttribute::new(R::id(), &rel_id),
            ],
        ),
    );
    Ok(master_id)
}

/// The presentation's notes master, if it has one.
pub fn notes_master_path(pkg: &OoxmlPackage) -> Result<Option<String>> {
    let pres_path = pkg.main_part_path()?;
    Ok(pkg
        .internal_targets(&pres_path)
        .into_iter()
        .find(|(rel, _)| rel.rel_type == rt::NOTES_MASTER)
        .map(|(_, path)| path))
}

/// Registers the single notes master of the presentation.
pub fn register_notes_master(pkg: &mut OoxmlPackage, notes_master_path: &str) -> Result<()> {
    let pres_path = pkg.main_part_path()?;
    let rel_id = pkg.add_relationship(&pres_path, rt::NOTES_MASTER, notes_master_path)?;
    let doc = pkg.xml_mut(&pres_path)?;
    doc.ensure_root_namespace("r", R::NS);
    let root = root_of(doc, &pres_path)?;
    let list = ensure_list(doc, root, &P::notesMasterIdLst(), &presentation_list_order());
    let stale: Vec<NodeId> = doc.elements_by_name(list, &P::notesMasterId()).collect();
    for node in stale {
        doc.remove(node);
    }
    doc.add_child(
        list,
        XmlNodeData::element_with_attrs(P::notesMasterId(), vec![XAttribute::new(R::id(), &rel_id)]),
    );
    Ok(())
}
