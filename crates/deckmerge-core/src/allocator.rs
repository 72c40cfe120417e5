//! Collision-free identifiers for one destination package.
//!
//! Every `next_*` call reserves what it returns, so two calls never hand out
//! the same value even if the first result was never attached. The allocator
//! is plain data owned by its package; snapshotting it is how imports roll
//! back their counters.

use crate::error::{DeckMergeError, Result};
use crate::package::paths;
use crate::package::relationships::Relationships;
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_SLIDE_ID: u32 = 256;
pub const MAX_SLIDE_ID: u32 = 2_147_483_647;
pub const MIN_MASTER_LAYOUT_ID: u32 = 2_147_483_648;
pub const MAX_MASTER_LAYOUT_ID: u32 = u32::MAX;

const DEFAULT_RELATIONSHIP_PREFIX: &str = "rId";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdAllocator {
    relationship_ids: BTreeMap<String, (String, u64)>,
    slide_ids: BTreeSet<u32>,
    master_layout_ids: BTreeSet<u32>,
    part_paths: BTreeSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next `rIdN` for `owner`: one past the highest trailing number among its
    /// existing and previously reserved ids, keeping the prefix of that id.
    pub fn next_relationship_id(&mut self, owner: &str, existing: &Relationships) -> Result<String> {
        let (mut prefix, mut max) = self
            .relationship_ids
            .get(owner)
            .cloned()
            .unwrap_or_else(|| (DEFAULT_RELATIONSHIP_PREFIX.to_string(), 0));
        for rel in existing.iter() {
            let (stem, number) = split_trailing_number(&rel.id);
            if let Some(number) = number {
                if number >= max {
                    max = number;
                    prefix = stem.to_string();
                }
            }
        }

        let mut next = max;
        let id = loop {
            next = next.checked_add(1).ok_or_else(|| {
                DeckMergeError::allocation(format!("relationship ids of '{owner}' exhausted"))
            })?;
            let candidate = format!("{prefix}{next}");
            if !existing.contains(&candidate) {
                break candidate;
            }
        };
        self.relationship_ids.insert(owner.to_string(), (prefix, next));
        Ok(id)
    }

    /// Next slide id (`p:sldId/@id`), never below 256 and never reused.
    pub fn next_slide_id(&mut self, used: impl IntoIterator<Item = u32>) -> Result<u32> {
        let id = next_in_range(
            &self.slide_ids,
            used,
            MIN_SLIDE_ID,
            MAX_SLIDE_ID,
            "slide",
        )?;
        self.slide_ids.insert(id);
        Ok(id)
    }

    /// Next id for `p:sldMasterId` or `p:sldLayoutId`; masters and layouts share one range.
    pub fn next_master_layout_id(&mut self, used: impl IntoIterator<Item = u32>) -> Result<u32> {
        let id = next_in_range(
            &self.master_layout_ids,
            used,
            MIN_MASTER_LAYOUT_ID,
            MAX_MASTER_LAYOUT_ID,
            "master/layout",
        )?;
        self.master_layout_ids.insert(id);
        Ok(id)
    }

    /// A free part path shaped like `template`.
    ///
    /// The template itself is returned when free; otherwise its trailing number
    /// is replaced by one past the highest number in use for the same stem.
    pub fn next_part_path<'a>(
        &mut self,
        template: &str,
        existing: impl IntoIterator<Item = &'a String>,
    ) -> Result<String> {
        let existing: BTreeSet<&str> = existing.into_iter().map(String::as_str).collect();
        let taken = |p: &str| existing.contains(p) || self.part_paths.contains(p);

        let path = if taken(template) {
            let (stem, _, suffix) = paths::split_numbered(template);
            let highest = existing
                .iter()
                .copied()
                .chain(self.part_paths.iter().map(String::as_str))
                .filter_map(|p| match paths::split_numbered(p) {
                    (s, Some(n), x) if s == stem && x == suffix => Some(n),
                    _ => None,
                })
                .max()
                .unwrap_or(0);
            let mut next = highest;
            loop {
                next = next.checked_add(1).ok_or_else(|| {
                    DeckMergeError::allocation(format!("no free part name for '{template}'"))
                })?;
                let candidate = format!("{stem}{next}{suffix}");
                if !taken(&candidate) {
                    break candidate;
                }
            }
        } else {
            template.to_string()
        };

        self.part_paths.insert(path.clone());
        Ok(path)
    }

    /// A media part name under `ppt/media/`, using `prefix` (default `image`) as the stem.
    pub fn next_media_filename<'a>(
        &mut self,
        extension: &str,
        prefix: Option<&str>,
        existing: impl IntoIterator<Item = &'a String>,
    ) -> Result<String> {
        let stem = prefix.filter(|p| !p.is_empty()).unwrap_or("image");
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.next_part_path(&format!("ppt/media/{stem}1.{extension}"), existing)
    }
}

fn next_in_range(
    reserved: &BTreeSet<u32>,
    used: impl IntoIterator<Item = u32>,
    min: u32,
    max: u32,
    what: &str,
) -> Result<u32> {
    let mut taken: BTreeSet<u32> = used.into_iter().collect();
    taken.extend(reserved.iter().copied());

    let highest = taken.range(min..=max).next_back().copied();
    match highest {
        None => Ok(min),
        Some(h) if h < max => Ok(h + 1),
        // Top of the range is used; fall back to the lowest gap.
        Some(_) => (min..=max)
            .find(|candidate| !taken.contains(candidate))
            .ok_or_else(|| DeckMergeError::allocation(format!("{what} ids exhausted"))),
    }
}

/// Splits `rId12` into (`rId`, `Some(12)`).
fn split_trailing_number(id: &str) -> (&str, Option<u64>) {
    let digits = id.bytes().rev().take_while(|b| b.is_ascii_digit()).count();
    let (stem, number) = id.split_at(id.len() - digits);
    (stem, number.parse().ok())
}
