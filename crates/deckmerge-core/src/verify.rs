//! Consistency checks over a whole package: relationship closure,
//! content-type completeness and slide id uniqueness.

use crate::allocator::{MAX_SLIDE_ID, MIN_SLIDE_ID};
use crate::error::Result;
use crate::graph;
use crate::package::content_types::CONTENT_TYPES_PATH;
use crate::package::paths;
use crate::package::OoxmlPackage;
use crate::presentation;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// XML uses a relationship id its part does not define.
    DanglingReference { part: String, rel_id: String },
    /// An internal relationship targets a part that does not exist.
    MissingTarget {
        owner: String,
        rel_id: String,
        target: String,
    },
    DuplicateRelationshipId { owner: String, rel_id: String },
    IllegalRelationship { owner: String, rel_id: String, rel_type: String },
    MissingContentType { part: String },
    DuplicateSlideId { id: u32 },
    SlideIdOutOfRange { id: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference { part, rel_id } => {
                write!(f, "{part}: '{rel_id}' is referenced but not defined")
            }
            Self::MissingTarget { owner, rel_id, target } => {
                write!(f, "{owner}: '{rel_id}' targets missing part '{target}'")
            }
            Self::DuplicateRelationshipId { owner, rel_id } => {
                write!(f, "{owner}: relationship id '{rel_id}' is used twice")
            }
            Self::IllegalRelationship { owner, rel_id, rel_type } => {
                write!(f, "{owner}: '{rel_id}' has type {rel_type}, not allowed here")
            }
            Self::MissingContentType { part } => write!(f, "{part}: no content type declared"),
            Self::DuplicateSlideId { id } => write!(f, "slide id {id} is used twice"),
            Self::SlideIdOutOfRange { id } => write!(f, "slide id {id} is out of range"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub parts_checked: usize,
    pub violations: Vec<Violation>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

pub fn verify_package(pkg: &OoxmlPackage) -> Result<VerificationReport> {
    let mut report = VerificationReport::default();

    let owners = std::iter::once(String::new()).chain(pkg.part_paths().cloned());
    for owner in owners {
        let Some(rels) = pkg.relationships(&owner) else {
            continue;
        };
        let mut seen = BTreeSet::new();
        for rel in rels.iter() {
            if !seen.insert(rel.id.as_str()) {
                report.violations.push(Violation::DuplicateRelationshipId {
                    owner: owner.clone(),
                    rel_id: rel.id.clone(),
                });
            }
            if rel.is_external() {
                continue;
            }
            let target = paths::resolve_target(&owner, &rel.target);
            if !pkg.contains(&target) {
                report.violations.push(Violation::MissingTarget {
                    owner: owner.clone(),
                    rel_id: rel.id.clone(),
                    target,
                });
            }
        }
        if let Some(part) = pkg.get_part(&owner) {
            for rel in graph::illegal_relationships(part.role, rels.iter()) {
                report.violations.push(Violation::IllegalRelationship {
                    owner: owner.clone(),
                    rel_id: rel.id.clone(),
                    rel_type: rel.rel_type.clone(),
                });
            }
        }
    }

    for part in pkg.parts() {
        report.parts_checked += 1;
        if pkg.content_type_of(&part.path).is_none() && part.path != CONTENT_TYPES_PATH {
            report.violations.push(Violation::MissingContentType {
                part: part.path.clone(),
            });
        }
        let Some(doc) = part.as_xml() else {
            continue;
        };
        for rel_id in graph::referenced_ids(doc, part.role) {
            if !part.relationships.contains(&rel_id) {
                report.violations.push(Violation::DanglingReference {
                    part: part.path.clone(),
                    rel_id,
                });
            }
        }
    }

    if pkg.main_part_path().is_ok() {
        let mut ids = BTreeSet::new();
        for slide in presentation::slides(pkg)? {
            if !(MIN_SLIDE_ID..=MAX_SLIDE_ID).contains(&slide.id) {
                report.violations.push(Violation::SlideIdOutOfRange { id: slide.id });
            }
            if !ids.insert(slide.id) {
                report.violations.push(Violation::DuplicateSlideId { id: slide.id });
            }
        }
    }

    Ok(report)
}
