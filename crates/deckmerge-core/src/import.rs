//! Copies a part and everything it transitively references from a source
//! package into a destination package.

use crate::error::{DeckMergeError, Result};
use crate::graph;
use crate::package::paths;
use crate::package::{OoxmlPackage, Part, PartRole, RemovalPolicy};
use crate::presentation;
use log::{debug, warn};
use std::collections::HashMap;

/// One import session against one source package.
///
/// The memo maps source paths to destination paths. It is filled before a
/// part's children are imported, which is what lets back-references
/// (notes slide to slide, layout to master) resolve to the copy in progress.
pub struct Importer<'s> {
    source: &'s OoxmlPackage,
    memo: HashMap<String, String>,
    media_prefix: Option<String>,
    created: Vec<String>,
}

impl<'s> Importer<'s> {
    pub fn new(source: &'s OoxmlPackage) -> Self {
        Self {
            source,
            memo: HashMap::new(),
            media_prefix: None,
            created: Vec::new(),
        }
    }

    pub fn with_media_prefix(mut self, prefix: Option<String>) -> Self {
        self.media_prefix = prefix;
        self
    }

    pub fn source(&self) -> &'s OoxmlPackage {
        self.source
    }

    /// Pins `source_path` to an existing destination part instead of importing it.
    pub fn bind(&mut self, source_path: &str, dest_path: &str) {
        self.memo
            .insert(source_path.to_string(), dest_path.to_string());
    }

    /// Destination path chosen for `source_path` in this session, if any.
    pub fn mapped(&self, source_path: &str) -> Option<&str> {
        self.memo.get(source_path).map(String::as_str)
    }

    /// Parts newly created in the destination by this session, in creation order.
    pub fn created(&self) -> &[String] {
        &self.created
    }

    /// Imports `source_path` (and its dependencies) and returns its destination path.
    ///
    /// Not transactional on its own; callers wrap it in `begin`/`rollback`.
    pub fn import_part(&mut self, dest: &mut OoxmlPackage, source_path: &str) -> Result<String> {
        if let Some(existing) = self.memo.get(source_path) {
            return Ok(existing.clone());
        }
        let part = self.source.part(source_path)?;

        if part.role == PartRole::NotesMaster {
            if let Some(existing) = presentation::notes_master_path(dest)? {
                debug!("notes master '{source_path}' bound to existing '{existing}'");
                self.bind(source_path, &existing);
                return Ok(existing);
            }
        }

        let dest_path = if part.role == PartRole::Media {
            let ext = paths::extension(source_path).unwrap_or_else(|| "bin".to_string());
            dest.allocate_media_path(&ext, self.media_prefix.as_deref())?
        } else {
            dest.allocate_part_path(source_path)?
        };
        self.bind(source_path, &dest_path);

        let content_type = self
            .source
            .content_type_of(source_path)
            .ok_or_else(|| {
                DeckMergeError::malformed(format!(
                    "{}: part '{source_path}' has no content type",
                    self.source.name()
                ))
            })?
            .to_string();
        let copy = Part {
            path: dest_path.clone(),
            role: part.role,
            content: part.content.clone(),
            relationships: Default::default(),
        };
        dest.add_part_with_type(copy, &content_type)?;
        self.created.push(dest_path.clone());
        debug!(
            "importing '{}:{source_path}' as '{dest_path}' ({:?})",
            self.source.name(),
            part.role
        );

        self.copy_relationships(dest, source_path, &dest_path, part.role)?;

        if let Some(existing) = dest.register_content(&dest_path)? {
            debug!("'{dest_path}' duplicates '{existing}', reusing it");
            dest.remove_part(&dest_path, RemovalPolicy::Reject)?;
            self.created.retain(|p| p != &dest_path);
            self.bind(source_path, &existing);
            return Ok(existing);
        }

        match part.role {
            PartRole::SlideMaster => {
                presentation::register_master(dest, &dest_path)?;
            }
            PartRole::NotesMaster => {
                presentation::register_notes_master(dest, &dest_path)?;
            }
            _ => {}
        }
        Ok(dest_path)
    }

    /// Imports a slide with its dependencies and appends it to the slide list.
    pub fn import_slide(&mut self, dest: &mut OoxmlPackage, source_slide: &str) -> Result<(String, u32)> {
        let role = self.source.part(source_slide)?.role;
        if role != PartRole::Slide {
            return Err(DeckMergeError::malformed(format!(
                "'{source_slide}' is a {role:?} part, not a slide"
            )));
        }
        let dest_path = self.import_part(dest, source_slide)?;
        let slide_id = presentation::append_slide(dest, &dest_path)?;
        Ok((dest_path, slide_id))
    }

    fn copy_relationships(
        &mut self,
        dest: &mut OoxmlPackage,
        source_path: &str,
        dest_path: &str,
        role: PartRole,
    ) -> Result<()> {
        let Some(rels) = self.source.relationships(source_path) else {
            return Ok(());
        };

        let mut id_map: HashMap<String, String> = HashMap::new();
        let mut target_map: HashMap<String, String> = HashMap::new();
        let mut illegal: Vec<String> = Vec::new();

        for rel in rels.iter() {
            if !rel.is_external() {
                let target = paths::resolve_target(source_path, &rel.target);
                let target_role = self
                    .source
                    .get_part(&target)
                    .map(|p| p.role)
                    .ok_or_else(|| DeckMergeError::UnresolvableRelationship {
                        part: source_path.to_string(),
                        rel_id: rel.id.clone(),
                        target: target.clone(),
                    })?;
                if !role.allows_child(&rel.rel_type) || target_role == PartRole::Presentation {
                    warn!(
                        "dropping {} relationship '{}' of '{source_path}': not allowed on a {role:?} part",
                        rel.rel_type, rel.id
                    );
                    illegal.push(rel.id.clone());
                    continue;
                }
                let dest_target = self.import_part(dest, &target)?;
                target_map.insert(target, dest_target);
            }
            let new_id = graph::copy_relationship(
                self.source,
                source_path,
                &rel.id,
                dest,
                dest_path,
                &target_map,
            )?;
            id_map.insert(rel.id.clone(), new_id);
        }

        if let Some(doc) = dest.part_mut(dest_path)?.as_xml_mut() {
            if !illegal.is_empty() {
                graph::strip_references(doc, role, &illegal);
            }
            graph::rewrite_references(doc, role, &id_map);
        }
        Ok(())
    }
}

/// Imports one part transactionally: on failure the destination is left untouched.
pub fn import_part(source: &OoxmlPackage, source_path: &str, dest: &mut OoxmlPackage) -> Result<String> {
    dest.begin();
    let result = Importer::new(source).import_part(dest, source_path);
    match result {
        Ok(path) => {
            dest.commit();
            Ok(path)
        }
        Err(e) => {
            dest.rollback();
            Err(e)
        }
    }
}
