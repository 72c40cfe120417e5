use super::content_types::{content_type_values as ctv, ContentTypes, CONTENT_TYPES_PATH};
use super::parts::{Part, PartContent, PartRole};
use super::paths;
use super::relationships::{relationship_types as rt, Relationship, Relationships};
use crate::allocator::IdAllocator;
use crate::error::{DeckMergeError, Result};
use crate::hash::{sha256_hash_bytes, sha256_hash_chunks};
use crate::xml::parser::parse_bytes;
use crate::xml::XmlDocument;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

/// What `remove_part` does with relationships that still point at the part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Fail with `PartInUse` if anything references the part.
    #[default]
    Reject,
    /// Delete the referencing relationships and the XML references that used them.
    CascadeRelationships,
}

/// Pre-transaction state needed to undo a failed multi-part operation.
#[derive(Debug, Clone)]
struct Journal {
    content_types: ContentTypes,
    root_relationships: Relationships,
    allocator: IdAllocator,
    content_index: BTreeMap<(PartRole, String), String>,
    /// Original version of every touched part; `None` if it did not exist.
    touched: BTreeMap<String, Option<Part>>,
}

/// An OPC package held fully in memory: parts, their relationships, the
/// content-type registry and the identifier counters of this package.
#[derive(Debug, Clone)]
pub struct OoxmlPackage {
    name: String,
    parts: BTreeMap<String, Part>,
    content_types: ContentTypes,
    root_relationships: Relationships,
    allocator: IdAllocator,
    content_index: BTreeMap<(PartRole, String), String>,
    journals: Vec<Journal>,
}

impl OoxmlPackage {
    pub fn open(bytes: &[u8]) -> Result<Self> {
        Self::open_named("package", bytes)
    }

    /// Loads a package and checks its relationship closure.
    pub fn open_named(name: &str, bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let mut entries: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            entries.insert(name, content);
        }

        let content_types = match entries.remove(CONTENT_TYPES_PATH) {
            Some(bytes) => ContentTypes::parse(&bytes)?,
            None => {
                return Err(DeckMergeError::malformed(format!(
                    "'{name}' has no {CONTENT_TYPES_PATH}"
                )))
            }
        };

        let mut relationships: HashMap<String, Relationships> = HashMap::new();
        let rels_paths: Vec<String> = entries
            .keys()
            .filter(|p| paths::is_rels_path(p))
            .cloned()
            .collect();
        for rels_path in rels_paths {
            let Some(bytes) = entries.remove(&rels_path) else {
                continue;
            };
            match paths::part_for_rels_path(&rels_path) {
                Some(owner) => {
                    relationships.insert(owner, Relationships::parse(&bytes)?);
                }
                None => warn!("{name}: ignoring stray relationships file '{rels_path}'"),
            }
        }

        // Relationship types give a role to parts whose content type is generic.
        let mut incoming_types: HashMap<String, String> = HashMap::new();
        for (owner, rels) in &relationships {
            for rel in rels.iter().filter(|r| !r.is_external()) {
                incoming_types.insert(paths::resolve_target(owner, &rel.target), rel.rel_type.clone());
            }
        }

        let mut parts = BTreeMap::new();
        for (path, bytes) in entries {
            let content_type = content_types.resolve(&path);
            if content_type.is_none() {
                return Err(DeckMergeError::malformed(format!(
                    "{name}: part '{path}' has no content type declaration"
                )));
            }
            let mut role = content_type
                .map(PartRole::from_content_type)
                .unwrap_or(PartRole::Other);
            if role == PartRole::Other {
                if let Some(rel_type) = incoming_types.get(&path) {
                    role = PartRole::from_relationship_type(rel_type);
                }
            }

            let content = if !role.is_binary() && is_xml_content(&path, content_type) {
                PartContent::Xml(parse_bytes(&bytes).map_err(|e| {
                    DeckMergeError::malformed(format!("part '{path}' is not well-formed XML: {e}"))
                })?)
            } else {
                PartContent::Binary(bytes)
            };

            let rels = relationships.remove(&path).unwrap_or_default();
            parts.insert(
                path.clone(),
                Part {
                    path,
                    role,
                    content,
                    relationships: rels,
                },
            );
        }

        let root_relationships = relationships.remove("").unwrap_or_default();
        for owner in relationships.keys() {
            warn!("{name}: relationships for missing part '{owner}' ignored");
        }

        let mut package = Self {
            name: name.to_string(),
            parts,
            content_types,
            root_relationships,
            allocator: IdAllocator::new(),
            content_index: BTreeMap::new(),
            journals: Vec::new(),
        };
        package.check_relationship_targets()?;
        package.rebuild_content_index()?;
        debug!(
            "opened package '{}' with {} parts",
            package.name,
            package.parts.len()
        );
        Ok(package)
    }

    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string());
        Self::open_named(&name, &bytes)
    }

    /// Loads and parses a package on the blocking pool as one step.
    #[cfg(feature = "async")]
    pub async fn open_file_async(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::open_file(path))
            .await
            .map_err(|e| DeckMergeError::Io(std::io::Error::other(e)))?
    }

    /// Serializes and writes the package on the blocking pool, handing it back afterwards.
    #[cfg(feature = "async")]
    pub async fn save_file_async(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<Self> {
            self.save_file(&path)?;
            Ok(self)
        })
        .await
        .map_err(|e| DeckMergeError::Io(std::io::Error::other(e)))?
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut buffer);
        let options: zip::write::FileOptions<'_, ()> =
            zip::write::FileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file(CONTENT_TYPES_PATH, options)?;
        writer.write_all(&self.content_types.to_xml()?)?;

        writer.start_file(paths::rels_path_for(""), options)?;
        writer.write_all(&self.root_relationships.to_xml()?)?;

        for (path, part) in &self.parts {
            writer.start_file(path.as_str(), options)?;
            writer.write_all(&part.to_bytes()?)?;
            if !part.relationships.is_empty() {
                writer.start_file(paths::rels_path_for(path), options)?;
                writer.write_all(&part.relationships.to_xml()?)?;
            }
        }

        writer.finish()?;
        Ok(buffer.into_inner())
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save()?)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    #[cfg(test)]
    pub(crate) fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    pub fn part_paths(&self) -> impl Iterator<Item = &String> {
        self.parts.keys()
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.parts.contains_key(path)
    }

    pub fn get_part(&self, path: &str) -> Option<&Part> {
        self.parts.get(path)
    }

    pub fn part(&self, path: &str) -> Result<&Part> {
        self.parts
            .get(path)
            .ok_or_else(|| DeckMergeError::missing_part(path))
    }

    pub fn xml(&self, path: &str) -> Result<&XmlDocument> {
        self.part(path)?
            .as_xml()
            .ok_or_else(|| DeckMergeError::malformed(format!("part '{path}' is not XML")))
    }

    /// Mutable access; the part stops being a dedup candidate until re-registered.
    pub fn part_mut(&mut self, path: &str) -> Result<&mut Part> {
        self.record(path);
        self.content_index.retain(|_, indexed| indexed != path);
        self.parts
            .get_mut(path)
            .ok_or_else(|| DeckMergeError::missing_part(path))
    }

    pub fn xml_mut(&mut self, path: &str) -> Result<&mut XmlDocument> {
        self.part_mut(path)?
            .as_xml_mut()
            .ok_or_else(|| DeckMergeError::malformed(format!("part '{path}' is not XML")))
    }

    /// Relationships owned by `owner`; `""` is the package root.
    pub fn relationships(&self, owner: &str) -> Option<&Relationships> {
        if owner.is_empty() {
            return Some(&self.root_relationships);
        }
        self.parts.get(owner).map(|p| &p.relationships)
    }

    pub fn relationships_mut(&mut self, owner: &str) -> Result<&mut Relationships> {
        if owner.is_empty() {
            return Ok(&mut self.root_relationships);
        }
        Ok(&mut self.part_mut(owner)?.relationships)
    }

    /// Declared content type of a part.
    pub fn content_type_of(&self, path: &str) -> Option<&str> {
        self.content_types.resolve(path)
    }

    /// Path of the main presentation part, found through the root officeDocument relationship.
    pub fn main_part_path(&self) -> Result<String> {
        self.root_relationships
            .first_of_type(rt::OFFICE_DOCUMENT)
            .map(|rel| paths::resolve_target("", &rel.target))
            .ok_or_else(|| DeckMergeError::malformed(format!("'{}' has no main document", self.name)))
    }

    /// Adds a part, declaring its role's canonical content type.
    pub fn add_part(&mut self, part: Part) -> Result<()> {
        let content_type = part
            .role
            .canonical_content_type(&part.path)
            .unwrap_or(if part.is_xml() { ctv::XML } else { ctv::OCTET_STREAM })
            .to_string();
        self.add_part_with_type(part, &content_type)
    }

    /// Adds a part whose content type is known (e.g. carried over from a source package).
    pub fn add_part_with_type(&mut self, part: Part, content_type: &str) -> Result<()> {
        if self.parts.contains_key(&part.path) {
            return Err(DeckMergeError::allocation(format!(
                "part '{}' already exists",
                part.path
            )));
        }
        let content_type = part
            .role
            .canonical_content_type(&part.path)
            .unwrap_or(content_type);
        self.content_types
            .ensure_declared(&part.path, content_type, part.role.is_binary())?;
        self.record(&part.path);
        debug!("{}: added part '{}' ({:?})", self.name, part.path, part.role);
        self.parts.insert(part.path.clone(), part);
        Ok(())
    }

    /// Removes a part. Relationships pointing at it are rejected or cascaded per `policy`.
    ///
    /// Returns the owners whose relationships were cascaded away.
    pub fn remove_part(&mut self, path: &str, policy: RemovalPolicy) -> Result<Vec<String>> {
        if !self.parts.contains_key(path) {
            return Err(DeckMergeError::missing_part(path));
        }
        let referencing = self.referencing(path);
        let owners: Vec<String> = {
            let mut owners: Vec<String> = referencing.iter().map(|(o, _)| o.clone()).collect();
            owners.dedup();
            owners
        };
        if policy == RemovalPolicy::Reject && !referencing.is_empty() {
            return Err(DeckMergeError::PartInUse {
                part_path: path.to_string(),
                referenced_by: owners,
            });
        }

        for owner in &owners {
            let ids: Vec<String> = referencing
                .iter()
                .filter(|(o, _)| o == owner)
                .map(|(_, id)| id.clone())
                .collect();
            let rels = self.relationships_mut(owner)?;
            for id in &ids {
                rels.remove(id);
            }
            if let Some(part) = self.parts.get(owner) {
                let role = part.role;
                if part.is_xml() {
                    let doc = self.xml_mut(owner)?;
                    crate::graph::strip_references(doc, role, &ids);
                }
            }
        }

        self.record(path);
        self.parts.remove(path);
        self.content_index.retain(|_, p| p != path);
        self.content_types
            .remove_if_unreferenced(path, self.parts.keys());
        debug!("{}: removed part '{path}'", self.name);
        Ok(owners)
    }

    /// `(owner, relationship id)` of every internal relationship targeting `path`.
    pub fn referencing(&self, path: &str) -> Vec<(String, String)> {
        let mut found = Vec::new();
        let owners = std::iter::once(("", &self.root_relationships))
            .chain(self.parts.iter().map(|(p, part)| (p.as_str(), &part.relationships)));
        for (owner, rels) in owners {
            for rel in rels.iter().filter(|r| !r.is_external()) {
                if paths::resolve_target(owner, &rel.target) == path {
                    found.push((owner.to_string(), rel.id.clone()));
                }
            }
        }
        found
    }

    /// Internal targets of `owner` as `(relationship, resolved path)`.
    pub fn internal_targets(&self, owner: &str) -> Vec<(Relationship, String)> {
        self.relationships(owner)
            .map(|rels| {
                rels.iter()
                    .filter(|r| !r.is_external())
                    .map(|r| (r.clone(), paths::resolve_target(owner, &r.target)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolved target of one relationship of `owner`.
    pub fn target_of(&self, owner: &str, rel_id: &str) -> Option<String> {
        let rel = self.relationships(owner)?.get(rel_id)?;
        if rel.is_external() {
            return None;
        }
        Some(paths::resolve_target(owner, &rel.target))
    }

    /// Adds an internal relationship from `owner` to `target_path` and returns its new id.
    pub fn add_relationship(&mut self, owner: &str, rel_type: &str, target_path: &str) -> Result<String> {
        let id = self.allocate_relationship_id(owner)?;
        let target = paths::relative_target(owner, target_path);
        self.relationships_mut(owner)?
            .push(Relationship::new(&id, rel_type, &target));
        Ok(id)
    }

    pub fn add_external_relationship(&mut self, owner: &str, rel_type: &str, target: &str) -> Result<String> {
        let id = self.allocate_relationship_id(owner)?;
        self.relationships_mut(owner)?
            .push(Relationship::external(&id, rel_type, target));
        Ok(id)
    }

    pub fn allocate_relationship_id(&mut self, owner: &str) -> Result<String> {
        let existing = if owner.is_empty() {
            &self.root_relationships
        } else {
            &self
                .parts
                .get(owner)
                .ok_or_else(|| DeckMergeError::missing_part(owner))?
                .relationships
        };
        self.allocator.next_relationship_id(owner, existing)
    }

    pub fn allocate_part_path(&mut self, template: &str) -> Result<String> {
        self.allocator.next_part_path(template, self.parts.keys())
    }

    pub fn allocate_media_path(&mut self, extension: &str, prefix: Option<&str>) -> Result<String> {
        self.allocator
            .next_media_filename(extension, prefix, self.parts.keys())
    }

    pub fn allocate_slide_id(&mut self, used: impl IntoIterator<Item = u32>) -> Result<u32> {
        self.allocator.next_slide_id(used)
    }

    pub fn allocate_master_layout_id(&mut self, used: impl IntoIterator<Item = u32>) -> Result<u32> {
        self.allocator.next_master_layout_id(used)
    }

    /// Content identity of a part as it would sit in this package: role,
    /// payload bytes and the (type, target) list of its relationships.
    pub fn content_key(&self, part: &Part) -> Result<String> {
        let payload = part.to_bytes()?;
        let mut rels: Vec<String> = part
            .relationships
            .iter()
            .map(|r| {
                let target = if r.is_external() {
                    r.target.clone()
                } else {
                    paths::resolve_target(&part.path, &r.target)
                };
                format!("{}|{}|{}", r.id, r.rel_type, target)
            })
            .collect();
        rels.sort();
        let role = format!("{:?}", part.role);
        let rels = rels.join("\n");
        Ok(sha256_hash_chunks([
            role.as_bytes(),
            payload.as_slice(),
            rels.as_bytes(),
        ]))
    }

    /// Indexes a finished part for content dedup.
    ///
    /// Returns the path of an already indexed identical part, in which case
    /// nothing is recorded and the caller should use that part instead.
    pub fn register_content(&mut self, path: &str) -> Result<Option<String>> {
        let part = self.part(path)?;
        if !part.role.dedup_by_content() {
            return Ok(None);
        }
        let key = (part.role, self.content_key(part)?);
        match self.content_index.get(&key) {
            Some(existing) if existing != path => Ok(Some(existing.clone())),
            Some(_) => Ok(None),
            None => {
                self.content_index.insert(key, path.to_string());
                Ok(None)
            }
        }
    }

    /// Starts a transaction; nested transactions fold into their parent on commit.
    pub fn begin(&mut self) {
        self.journals.push(Journal {
            content_types: self.content_types.clone(),
            root_relationships: self.root_relationships.clone(),
            allocator: self.allocator.clone(),
            content_index: self.content_index.clone(),
            touched: BTreeMap::new(),
        });
    }

    pub fn commit(&mut self) {
        let Some(journal) = self.journals.pop() else {
            return;
        };
        if let Some(parent) = self.journals.last_mut() {
            for (path, original) in journal.touched {
                parent.touched.entry(path).or_insert(original);
            }
        }
    }

    /// Restores every part, relationship, declaration and counter to the state at `begin`.
    pub fn rollback(&mut self) {
        let Some(journal) = self.journals.pop() else {
            return;
        };
        for (path, original) in journal.touched {
            match original {
                Some(part) => {
                    self.parts.insert(path, part);
                }
                None => {
                    self.parts.remove(&path);
                }
            }
        }
        self.content_types = journal.content_types;
        self.root_relationships = journal.root_relationships;
        self.allocator = journal.allocator;
        self.content_index = journal.content_index;
        debug!("{}: rolled back transaction", self.name);
    }

    pub fn in_transaction(&self) -> bool {
        !self.journals.is_empty()
    }

    /// SHA-256 of every stored entry as it would be written, keyed by archive path.
    pub fn part_digests(&self) -> Result<BTreeMap<String, String>> {
        let mut digests = BTreeMap::new();
        digests.insert(
            CONTENT_TYPES_PATH.to_string(),
            sha256_hash_bytes(&self.content_types.to_xml()?),
        );
        digests.insert(
            paths::rels_path_for(""),
            sha256_hash_bytes(&self.root_relationships.to_xml()?),
        );
        for (path, part) in &self.parts {
            digests.insert(path.clone(), sha256_hash_bytes(&part.to_bytes()?));
            if !part.relationships.is_empty() {
                digests.insert(
                    paths::rels_path_for(path),
                    sha256_hash_bytes(&part.relationships.to_xml()?),
                );
            }
        }
        Ok(digests)
    }

    fn record(&mut self, path: &str) {
        let Some(journal) = self.journals.last_mut() else {
            return;
        };
        if !journal.touched.contains_key(path) {
            journal
                .touched
                .insert(path.to_string(), self.parts.get(path).cloned());
        }
    }

    fn check_relationship_targets(&self) -> Result<()> {
        let owners = std::iter::once(("", &self.root_relationships))
            .chain(self.parts.iter().map(|(p, part)| (p.as_str(), &part.relationships)));
        for (owner, rels) in owners {
            for rel in rels.iter().filter(|r| !r.is_external()) {
                let target = paths::resolve_target(owner, &rel.target);
                if !self.parts.contains_key(&target) {
                    return Err(DeckMergeError::malformed(format!(
                        "relationship '{}' of '{}' in '{}' targets missing part '{}'",
                        rel.id,
                        if owner.is_empty() { "/" } else { owner },
                        self.name,
                        target
                    )));
                }
            }
        }
        Ok(())
    }

    fn rebuild_content_index(&mut self) -> Result<()> {
        let mut index = BTreeMap::new();
        for part in self.parts.values().filter(|p| p.role.dedup_by_content()) {
            index
                .entry((part.role, self.content_key(part)?))
                .or_insert_with(|| part.path.clone());
        }
        self.content_index = index;
        Ok(())
    }
}

fn is_xml_content(path: &str, content_type: Option<&str>) -> bool {
    match content_type {
        Some(ct) => ct.ends_with("+xml") || ct == ctv::XML || ct == "text/xml",
        None => paths::extension(path).as_deref() == Some("xml"),
    }
}
