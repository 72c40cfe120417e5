//! Decides which destination layout (and master) an imported slide binds to.
//!
//! Resolution runs `NeedMaster -> NeedLayout -> Bound`. The outcome is
//! recorded in the [`Importer`] memo, so the slide's own import then points
//! its layout relationship at the resolved destination layout.

use crate::error::{DeckMergeError, Result};
use crate::import::Importer;
use crate::package::relationships::relationship_types as rt;
use crate::package::OoxmlPackage;
use crate::presentation;
use crate::settings::{LayoutStrategy, MasterMode, MergeOptions};
use crate::xml::namespaces::{A, P};
use crate::xml::{XName, XmlDocument};
use indextree::NodeId;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    NeedMaster,
    NeedLayout,
    Bound,
}

/// Structural identity of a master: its name and the ordered names of its layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterSignature {
    pub name: String,
    pub layouts: Vec<String>,
}

impl MasterSignature {
    pub fn read(pkg: &OoxmlPackage, master_path: &str) -> Result<Self> {
        let name = part_name(pkg.xml(master_path)?);
        let layouts = master_layouts(pkg, master_path)?
            .iter()
            .map(|layout| pkg.xml(layout).map(part_name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name, layouts })
    }
}

/// Placeholder identity within a layout: type plus index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlaceholderKey {
    pub kind: String,
    pub index: u32,
}

impl fmt::Display for PlaceholderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderBinding {
    pub key: PlaceholderKey,
    pub incoming_shape: String,
    pub destination_shape: String,
}

/// Result of merging an incoming layout onto a destination layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutMerge {
    pub bindings: Vec<PlaceholderBinding>,
    /// Incoming placeholders with no counterpart; they are not added.
    pub dropped: Vec<PlaceholderKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutResolution {
    pub layout: String,
    pub master: String,
    pub master_imported: bool,
    pub merge: Option<LayoutMerge>,
}

/// Resolves the layout of `source_slide` (a slide of the importer's source)
/// into the destination and pins it in the importer's memo.
pub fn resolve_layout(
    dest: &mut OoxmlPackage,
    importer: &mut Importer<'_>,
    source_slide: &str,
    mode: MasterMode,
    strategy: &LayoutStrategy,
) -> Result<LayoutResolution> {
    let source = importer.source();
    let source_layout = target_of_type(source, source_slide, rt::SLIDE_LAYOUT)
        .ok_or_else(|| DeckMergeError::unbound_layout(source_slide, "slide has no layout"))?;
    let source_master = target_of_type(source, &source_layout, rt::SLIDE_MASTER).ok_or_else(|| {
        DeckMergeError::unbound_layout(source_slide, format!("layout '{source_layout}' has no master"))
    })?;

    let mut state = BindingState::NeedMaster;
    let mut existing_master: Option<String> = None;
    let mut resolution: Option<LayoutResolution> = None;

    while state != BindingState::Bound {
        state = match state {
            BindingState::NeedMaster => {
                existing_master = find_matching_master(dest, source, &source_master, mode)?;
                if let Some(master) = &existing_master {
                    debug!("'{source_master}' matches destination master '{master}'");
                }
                BindingState::NeedLayout
            }
            BindingState::NeedLayout => {
                let resolved = match strategy {
                    LayoutStrategy::UseSource => use_source_layout(
                        dest,
                        importer,
                        source_slide,
                        &source_layout,
                        &source_master,
                        existing_master.as_deref(),
                        mode,
                    )?,
                    LayoutStrategy::ByName(name) => {
                        let layout = find_layout_by_name(dest, name, existing_master.as_deref())?
                            .ok_or_else(|| {
                                DeckMergeError::unbound_layout(
                                    source_slide,
                                    format!("no layout named '{name}' in the destination"),
                                )
                            })?;
                        bound_to(dest, layout, None)?
                    }
                    LayoutStrategy::Merge(options) => {
                        let name = part_name(source.xml(&source_layout)?);
                        let layout = find_layout_by_name(dest, &name, existing_master.as_deref())?
                            .ok_or_else(|| {
                                DeckMergeError::unbound_layout(
                                    source_slide,
                                    format!("no layout named '{name}' to merge into"),
                                )
                            })?;
                        let merge =
                            merge_layout(source.xml(&source_layout)?, dest.xml_mut(&layout)?, *options);
                        for key in &merge.dropped {
                            warn!("placeholder {key} of '{source_layout}' has no match in '{layout}', dropped");
                        }
                        bound_to(dest, layout, Some(merge))?
                    }
                };
                importer.bind(&source_layout, &resolved.layout);
                if !resolved.master_imported {
                    importer.bind(&source_master, &resolved.master);
                }
                resolution = Some(resolved);
                BindingState::Bound
            }
            BindingState::Bound => BindingState::Bound,
        };
    }

    resolution.ok_or_else(|| DeckMergeError::unbound_layout(source_slide, "no resolution path"))
}

fn use_source_layout(
    dest: &mut OoxmlPackage,
    importer: &mut Importer<'_>,
    source_slide: &str,
    source_layout: &str,
    source_master: &str,
    existing_master: Option<&str>,
    mode: MasterMode,
) -> Result<LayoutResolution> {
    let source = importer.source();
    if let Some(master) = existing_master {
        let layout = match mode {
            // Signatures are equal, so layouts line up by position.
            MasterMode::AutoImport => {
                let position = master_layouts(source, source_master)?
                    .iter()
                    .position(|l| l == source_layout);
                let candidates = master_layouts(dest, master)?;
                position.and_then(|i| candidates.get(i).cloned())
            }
            MasterMode::Explicit => {
                let name = part_name(source.xml(source_layout)?);
                find_layout_by_name(dest, &name, Some(master))?
            }
        };
        let layout = layout.ok_or_else(|| {
            DeckMergeError::unbound_layout(
                source_slide,
                format!("master '{master}' has no counterpart of '{source_layout}'"),
            )
        })?;
        return bound_to(dest, layout, None);
    }

    if mode == MasterMode::Explicit {
        let name = part_name(source.xml(source_master)?);
        return Err(DeckMergeError::unbound_layout(
            source_slide,
            format!("master '{name}' has not been added to the destination"),
        ));
    }

    let master = importer.import_part(dest, source_master)?;
    let layout = importer.import_part(dest, source_layout)?;
    info!("auto-imported master '{source_master}' as '{master}'");
    Ok(LayoutResolution {
        layout,
        master,
        master_imported: true,
        merge: None,
    })
}

fn bound_to(dest: &OoxmlPackage, layout: String, merge: Option<LayoutMerge>) -> Result<LayoutResolution> {
    let master = target_of_type(dest, &layout, rt::SLIDE_MASTER)
        .ok_or_else(|| DeckMergeError::malformed(format!("layout '{layout}' has no master")))?;
    Ok(LayoutResolution {
        layout,
        master,
        master_imported: false,
        merge,
    })
}

fn find_matching_master(
    dest: &OoxmlPackage,
    source: &OoxmlPackage,
    source_master: &str,
    mode: MasterMode,
) -> Result<Option<String>> {
    match mode {
        MasterMode::AutoImport => {
            let wanted = MasterSignature::read(source, source_master)?;
            for master in presentation::master_paths(dest)? {
                if MasterSignature::read(dest, &master)? == wanted {
                    return Ok(Some(master));
                }
            }
            Ok(None)
        }
        MasterMode::Explicit => {
            let wanted = part_name(source.xml(source_master)?);
            for master in presentation::master_paths(dest)? {
                if part_name(dest.xml(&master)?) == wanted {
                    return Ok(Some(master));
                }
            }
            Ok(None)
        }
    }
}

/// Finds a destination layout by name, looking in `preferred_master` first.
pub fn find_layout_by_name(
    dest: &OoxmlPackage,
    name: &str,
    preferred_master: Option<&str>,
) -> Result<Option<String>> {
    let mut masters = presentation::master_paths(dest)?;
    if let Some(preferred) = preferred_master {
        masters.retain(|m| m != preferred);
        masters.insert(0, preferred.to_string());
    }
    for master in masters {
        for layout in master_layouts(dest, &master)? {
            if part_name(dest.xml(&layout)?) == name {
                return Ok(Some(layout));
            }
        }
    }
    Ok(None)
}

/// Binds incoming placeholders to destination placeholders by type and index.
///
/// Each destination placeholder binds at most once. Bound destination
/// placeholders keep their own properties apart from what `options` opts
/// into; unmatched incoming placeholders are reported and never inserted.
pub fn merge_layout(incoming: &XmlDocument, dest: &mut XmlDocument, options: MergeOptions) -> LayoutMerge {
    let incoming_placeholders = placeholders(incoming);
    let dest_placeholders = placeholders(dest);
    let mut taken = vec![false; dest_placeholders.len()];
    let mut merge = LayoutMerge::default();

    for (key, incoming_shape) in incoming_placeholders {
        let slot = dest_placeholders
            .iter()
            .enumerate()
            .find(|(i, (k, _))| !taken[*i] && *k == key)
            .map(|(i, (_, shape))| (i, *shape));
        let Some((i, dest_shape)) = slot else {
            merge.dropped.push(key);
            continue;
        };
        taken[i] = true;
        if options.copy_fill {
            copy_fill(incoming, incoming_shape, dest, dest_shape);
        }
        if options.copy_text_format {
            copy_text_format(incoming, incoming_shape, dest, dest_shape);
        }
        merge.bindings.push(PlaceholderBinding {
            key,
            incoming_shape: shape_name(incoming, incoming_shape),
            destination_shape: shape_name(dest, dest_shape),
        });
    }
    merge
}

/// Placeholder shapes in document order with their keys.
pub fn placeholders(doc: &XmlDocument) -> Vec<(PlaceholderKey, NodeId)> {
    let Some(root) = doc.root() else {
        return Vec::new();
    };
    doc.descendants_named(root, &P::ph())
        .into_iter()
        .filter_map(|ph| {
            // ph -> nvPr -> nv*Pr -> shape
            let shape = doc.ancestors(ph).nth(3)?;
            let key = PlaceholderKey {
                kind: doc.local_attribute(ph, "type").unwrap_or("obj").to_string(),
                index: doc
                    .local_attribute(ph, "idx")
                    .and_then(|i| i.parse().ok())
                    .unwrap_or(0),
            };
            Some((key, shape))
        })
        .collect()
}

fn fill_names() -> [XName; 4] {
    [A::noFill(), A::solidFill(), A::gradFill(), A::pattFill()]
}

fn copy_fill(incoming: &XmlDocument, incoming_shape: NodeId, dest: &mut XmlDocument, dest_shape: NodeId) {
    let fills = fill_names();
    let Some(source_fill) = incoming
        .find_child(incoming_shape, &P::spPr())
        .and_then(|sp_pr| {
            incoming
                .element_children(sp_pr)
                .find(|&c| incoming.name(c).map(|n| fills.contains(n)).unwrap_or(false))
        })
    else {
        return;
    };
    let sp_pr = dest.get_or_add_child(dest_shape, &P::spPr());
    let stale: Vec<NodeId> = dest
        .element_children(sp_pr)
        .filter(|&c| {
            dest.name(c)
                .map(|n| fills.contains(n) || *n == A::blipFill() || *n == A::grpFill())
                .unwrap_or(false)
        })
        .collect();
    for node in stale {
        dest.remove(node);
    }
    // fill follows the transform and geometry
    let anchor = dest
        .element_children(sp_pr)
        .filter(|&c| dest.is(c, &A::xfrm()) || dest.is(c, &A::prstGeom()) || dest.is(c, &A::custGeom()))
        .last();
    let first = dest.element_children(sp_pr).next();
    match (anchor, first) {
        (Some(anchor), _) => dest.copy_subtree_after(incoming, source_fill, anchor),
        (None, Some(first)) => dest.copy_subtree_before(incoming, source_fill, first),
        (None, None) => dest.copy_subtree_into(incoming, source_fill, sp_pr),
    };
}

fn copy_text_format(incoming: &XmlDocument, incoming_shape: NodeId, dest: &mut XmlDocument, dest_shape: NodeId) {
    let (Some(source_body), Some(dest_body)) = (
        incoming.find_child(incoming_shape, &P::txBody()),
        dest.find_child(dest_shape, &P::txBody()),
    ) else {
        return;
    };
    for name in [A::bodyPr(), A::lstStyle()] {
        let Some(source_node) = incoming.find_child(source_body, &name) else {
            continue;
        };
        match dest.find_child(dest_body, &name) {
            Some(existing) => {
                dest.copy_subtree_before(incoming, source_node, existing);
                dest.remove(existing);
            }
            None => {
                let after = dest.find_child(dest_body, &A::bodyPr());
                match after {
                    Some(body_pr) if name == A::lstStyle() => {
                        dest.copy_subtree_after(incoming, source_node, body_pr);
                    }
                    _ => {
                        let first = dest.element_children(dest_body).next();
                        match first {
                            Some(first) => dest.copy_subtree_before(incoming, source_node, first),
                            None => dest.copy_subtree_into(incoming, source_node, dest_body),
                        };
                    }
                }
            }
        }
    }
}

fn shape_name(doc: &XmlDocument, shape: NodeId) -> String {
    doc.descendants(shape)
        .find(|&n| doc.is(n, &P::cNvPr()))
        .and_then(|n| doc.local_attribute(n, "name"))
        .unwrap_or_default()
        .to_string()
}

/// `p:cSld/@name` of a slide, layout or master.
pub fn part_name(doc: &XmlDocument) -> String {
    doc.root()
        .and_then(|root| doc.find_child(root, &P::cSld()))
        .and_then(|c_sld| doc.local_attribute(c_sld, "name"))
        .unwrap_or_default()
        .to_string()
}

/// Layouts of a master: the id list order, falling back to relationship order.
fn master_layouts(pkg: &OoxmlPackage, master_path: &str) -> Result<Vec<String>> {
    let listed = presentation::layout_paths(pkg, master_path)?;
    if !listed.is_empty() {
        return Ok(listed);
    }
    Ok(pkg
        .internal_targets(master_path)
        .into_iter()
        .filter(|(rel, _)| rel.rel_type == rt::SLIDE_LAYOUT)
        .map(|(_, target)| target)
        .collect())
}

fn target_of_type(pkg: &OoxmlPackage, owner: &str, rel_type: &str) -> Option<String> {
    pkg.internal_targets(owner)
        .into_iter()
        .find(|(rel, _)| rel.rel_type == rel_type)
        .map(|(_, target)| target)
}
