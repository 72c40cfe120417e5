use super::paths;
use crate::error::{DeckMergeError, Result};
use crate::xml::namespaces::CT;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use std::io::Cursor;

pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// The `[Content_Types].xml` registry.
///
/// Defaults are keyed by lower-cased extension, overrides by part path
/// (stored without the leading slash). Both maps make duplicates impossible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

/// Outcome of [`ContentTypes::ensure_declared`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// Already covered by an override or a matching default.
    Existing,
    AddedDefault,
    AddedOverride,
}

impl ContentTypes {
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.add_default("rels", content_type_values::RELATIONSHIPS);
        registry.add_default("xml", content_type_values::XML);
        registry
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DeckMergeError::malformed(format!("{CONTENT_TYPES_PATH} is not UTF-8: {e}")))?;
        let doc = roxmltree::Document::parse(text.trim_start_matches('\u{feff}')).map_err(|e| {
            DeckMergeError::XmlParse {
                message: e.to_string(),
                location: format!("{CONTENT_TYPES_PATH} line {}", e.pos().row),
            }
        })?;

        let mut registry = Self::default();
        for node in doc.root_element().children().filter(|n| n.is_element()) {
            match (node.tag_name().name(), node.attribute("ContentType")) {
                ("Default", Some(ct)) => {
                    if let Some(ext) = node.attribute("Extension") {
                        registry.add_default(ext, ct);
                    }
                }
                ("Override", Some(ct)) => {
                    if let Some(part_name) = node.attribute("PartName") {
                        registry.set_override(part_name, ct);
                    }
                }
                _ => {}
            }
        }
        Ok(registry)
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(write_error)?;

        let mut root = BytesStart::new("Types");
        root.push_attribute(("xmlns", CT::NS));
        writer.write_event(Event::Start(root)).map_err(write_error)?;

        for (ext, ct) in &self.defaults {
            let mut elem = BytesStart::new("Default");
            elem.push_attribute(("Extension", ext.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            writer.write_event(Event::Empty(elem)).map_err(write_error)?;
        }
        for (path, ct) in &self.overrides {
            let part_name = format!("/{path}");
            let mut elem = BytesStart::new("Override");
            elem.push_attribute(("PartName", part_name.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            writer.write_event(Event::Empty(elem)).map_err(write_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("Types")))
            .map_err(write_error)?;
        Ok(writer.into_inner().into_inner())
    }

    /// The single declaration that applies to `path`: override first, then default.
    /// An empty `ContentType` declares nothing and resolves to `None`.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        let path = path.trim_start_matches('/');
        let declared = match self.overrides.get(path) {
            Some(ct) => Some(ct.as_str()),
            None => paths::extension(path).and_then(|ext| self.defaults.get(&ext).map(String::as_str)),
        };
        declared.filter(|ct| !ct.is_empty())
    }

    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn override_for(&self, path: &str) -> Option<&str> {
        self.overrides
            .get(path.trim_start_matches('/'))
            .map(String::as_str)
    }

    pub fn set_override(&mut self, path: &str, content_type: &str) {
        self.overrides.insert(
            path.trim_start_matches('/').to_string(),
            content_type.to_string(),
        );
    }

    /// Adds a default unless one is already declared for the extension.
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        self.defaults
            .entry(extension.to_ascii_lowercase())
            .or_insert_with(|| content_type.to_string());
    }

    /// Makes sure `path` resolves to `content_type`.
    ///
    /// An empty `content_type` is refused. A non-empty override wins untouched
    /// and an empty one is replaced. A default for the extension is
    /// accepted when it yields `content_type`. Otherwise a binary part whose
    /// extension is undeclared gets a new default, and everything else gets an
    /// override.
    pub fn ensure_declared(&mut self, path: &str, content_type: &str, is_binary: bool) -> Result<Declaration> {
        if content_type.is_empty() {
            return Err(DeckMergeError::malformed(format!(
                "no content type known for part '{path}'"
            )));
        }
        match self.override_for(path) {
            Some(declared) if !declared.is_empty() => return Ok(Declaration::Existing),
            Some(_) => {
                self.set_override(path, content_type);
                return Ok(Declaration::AddedOverride);
            }
            None => {}
        }
        let ext = paths::extension(path);
        let default = ext
            .as_deref()
            .and_then(|e| self.default_for(e))
            .map(str::to_string);
        Ok(match (default, ext) {
            (Some(existing), _) if existing == content_type => Declaration::Existing,
            (None, Some(ext)) if is_binary => {
                self.add_default(&ext, content_type);
                Declaration::AddedDefault
            }
            _ => {
                self.set_override(path, content_type);
                Declaration::AddedOverride
            }
        })
    }

    /// Drops the override of a part that is no longer in the package.
    pub fn remove_if_unreferenced<'a>(
        &mut self,
        path: &str,
        mut live_parts: impl Iterator<Item = &'a String>,
    ) -> bool {
        let path = path.trim_start_matches('/');
        if live_parts.any(|p| p == path) {
            return false;
        }
        self.overrides.remove(path).is_some()
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&String, &String)> {
        self.overrides.iter()
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&String, &String)> {
        self.defaults.iter()
    }
}

fn write_error(e: impl std::fmt::Display) -> DeckMergeError {
    DeckMergeError::XmlWrite(e.to_string())
}

pub mod content_type_values {
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";
    pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
    pub const PRESENTATION: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const SLIDE_LAYOUT: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
    pub const SLIDE_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
    pub const NOTES_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
    pub const NOTES_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
    pub const CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
    pub const EMBEDDED_WORKBOOK: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    pub const WORKBOOK: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
    pub const WORKSHEET: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
    pub const SHARED_STRINGS: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
    pub const TABLE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml";
    pub const OCTET_STREAM: &str = "application/octet-stream";

    /// Content type for a media extension (lower-case, without the dot).
    pub fn for_media_extension(ext: &str) -> &'static str {
        match ext {
            "png" => "image/png",
            "jpg" | "jpeg" | "jpe" => "image/jpeg",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "tif" | "tiff" => "image/tiff",
            "svg" => "image/svg+xml",
            "emf" => "image/x-emf",
            "wmf" => "image/x-wmf",
            "wdp" => "image/vnd.ms-photo",
            "mp4" => "video/mp4",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "xlsx" => EMBEDDED_WORKBOOK,
            "bin" => "application/vnd.openxmlformats-officedocument.oleObject",
            _ => OCTET_STREAM,
        }
    }
}
