use super::content_types::content_type_values as ctv;
use super::paths;
use super::relationships::relationship_types as rt;
use super::relationships::Relationships;
use crate::error::Result;
use crate::xml::namespaces::R;
use crate::xml::{XName, XmlDocument};
use once_cell::sync::Lazy;
use serde::Serialize;

/// The closed set of part roles the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PartRole {
    Presentation,
    Slide,
    SlideLayout,
    SlideMaster,
    NotesSlide,
    NotesMaster,
    HandoutMaster,
    Theme,
    Chart,
    EmbeddedWorkbook,
    Workbook,
    Worksheet,
    SharedStrings,
    Table,
    Media,
    CoreProperties,
    Other,
}

static DRAWING_REFERENCE_ATTRIBUTES: Lazy<Vec<XName>> = Lazy::new(|| {
    vec![
        R::id(),
        R::embed(),
        R::link(),
        R::pict(),
        R::dm(),
        R::lo(),
        R::qs(),
        R::cs(),
    ]
});

static CHART_REFERENCE_ATTRIBUTES: Lazy<Vec<XName>> =
    Lazy::new(|| vec![R::id(), R::embed(), R::link()]);

static SPREADSHEET_REFERENCE_ATTRIBUTES: Lazy<Vec<XName>> = Lazy::new(|| vec![R::id()]);

const PRESENTATION_STRUCTURE: &[&str] = &[
    rt::OFFICE_DOCUMENT,
    rt::SLIDE,
    rt::SLIDE_LAYOUT,
    rt::SLIDE_MASTER,
    rt::NOTES_SLIDE,
    rt::NOTES_MASTER,
    rt::HANDOUT_MASTER,
];

impl PartRole {
    /// Role of the part a relationship of `rel_type` points at.
    pub fn from_relationship_type(rel_type: &str) -> Self {
        match rel_type {
            rt::OFFICE_DOCUMENT => Self::Presentation,
            rt::SLIDE => Self::Slide,
            rt::SLIDE_LAYOUT => Self::SlideLayout,
            rt::SLIDE_MASTER => Self::SlideMaster,
            rt::NOTES_SLIDE => Self::NotesSlide,
            rt::NOTES_MASTER => Self::NotesMaster,
            rt::HANDOUT_MASTER => Self::HandoutMaster,
            rt::THEME => Self::Theme,
            rt::CHART => Self::Chart,
            rt::PACKAGE => Self::EmbeddedWorkbook,
            rt::WORKSHEET => Self::Worksheet,
            rt::SHARED_STRINGS => Self::SharedStrings,
            rt::TABLE => Self::Table,
            rt::CORE_PROPERTIES => Self::CoreProperties,
            rt::IMAGE | rt::MEDIA | rt::VIDEO | rt::AUDIO | rt::OLE_OBJECT => Self::Media,
            _ => Self::Other,
        }
    }

    /// Role implied by a declared content type.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            ctv::PRESENTATION => Self::Presentation,
            ctv::SLIDE => Self::Slide,
            ctv::SLIDE_LAYOUT => Self::SlideLayout,
            ctv::SLIDE_MASTER => Self::SlideMaster,
            ctv::NOTES_SLIDE => Self::NotesSlide,
            ctv::NOTES_MASTER => Self::NotesMaster,
            ctv::THEME => Self::Theme,
            ctv::CHART => Self::Chart,
            ctv::EMBEDDED_WORKBOOK => Self::EmbeddedWorkbook,
            ctv::WORKBOOK => Self::Workbook,
            ctv::WORKSHEET => Self::Worksheet,
            ctv::SHARED_STRINGS => Self::SharedStrings,
            ctv::TABLE => Self::Table,
            ctv::CORE_PROPERTIES => Self::CoreProperties,
            ct if ct.ends_with("handoutMaster+xml") => Self::HandoutMaster,
            ct if ct.starts_with("image/")
                || ct.starts_with("video/")
                || ct.starts_with("audio/")
                || ct.ends_with(".oleObject") =>
            {
                Self::Media
            }
            _ => Self::Other,
        }
    }

    /// Relationship types a part of this role must never carry.
    pub fn forbidden_children(self) -> &'static [&'static str] {
        match self {
            Self::Slide => &[
                rt::OFFICE_DOCUMENT,
                rt::SLIDE,
                rt::SLIDE_MASTER,
                rt::NOTES_MASTER,
                rt::HANDOUT_MASTER,
                rt::THEME,
            ],
            Self::SlideLayout => &[
                rt::OFFICE_DOCUMENT,
                rt::SLIDE,
                rt::SLIDE_LAYOUT,
                rt::NOTES_SLIDE,
                rt::NOTES_MASTER,
            ],
            Self::SlideMaster => &[
                rt::OFFICE_DOCUMENT,
                rt::SLIDE,
                rt::SLIDE_MASTER,
                rt::NOTES_SLIDE,
                rt::NOTES_MASTER,
            ],
            Self::NotesSlide => &[
                rt::OFFICE_DOCUMENT,
                rt::SLIDE_LAYOUT,
                rt::SLIDE_MASTER,
                rt::NOTES_SLIDE,
            ],
            Self::NotesMaster | Self::HandoutMaster => &[
                rt::OFFICE_DOCUMENT,
                rt::SLIDE,
                rt::SLIDE_LAYOUT,
                rt::SLIDE_MASTER,
                rt::NOTES_SLIDE,
            ],
            Self::Theme | Self::Chart => PRESENTATION_STRUCTURE,
            _ => &[],
        }
    }

    /// Whether a part of this role may hold a relationship of `rel_type`.
    pub fn allows_child(self, rel_type: &str) -> bool {
        if !self.has_relationships() {
            return false;
        }
        !self.forbidden_children().contains(&rel_type)
    }

    /// Binary parts never own a `.rels` file.
    pub fn has_relationships(self) -> bool {
        !matches!(self, Self::Media | Self::EmbeddedWorkbook)
    }

    /// Attributes that carry relationship ids in parts of this role.
    pub fn reference_attributes(self) -> &'static [XName] {
        match self {
            Self::Chart => CHART_REFERENCE_ATTRIBUTES.as_slice(),
            Self::Workbook | Self::Worksheet | Self::SharedStrings | Self::Table => {
                SPREADSHEET_REFERENCE_ATTRIBUTES.as_slice()
            }
            Self::Media | Self::EmbeddedWorkbook => &[],
            _ => DRAWING_REFERENCE_ATTRIBUTES.as_slice(),
        }
    }

    /// The content type a part of this role is declared with.
    pub fn canonical_content_type(self, path: &str) -> Option<&'static str> {
        Some(match self {
            Self::Presentation => ctv::PRESENTATION,
            Self::Slide => ctv::SLIDE,
            Self::SlideLayout => ctv::SLIDE_LAYOUT,
            Self::SlideMaster => ctv::SLIDE_MASTER,
            Self::NotesSlide => ctv::NOTES_SLIDE,
            Self::NotesMaster => ctv::NOTES_MASTER,
            Self::Theme => ctv::THEME,
            Self::Chart => ctv::CHART,
            Self::EmbeddedWorkbook => ctv::EMBEDDED_WORKBOOK,
            Self::Workbook => ctv::WORKBOOK,
            Self::Worksheet => ctv::WORKSHEET,
            Self::SharedStrings => ctv::SHARED_STRINGS,
            Self::Table => ctv::TABLE,
            Self::CoreProperties => ctv::CORE_PROPERTIES,
            Self::Media => ctv::for_media_extension(paths::extension(path)?.as_str()),
            Self::HandoutMaster | Self::Other => return None,
        })
    }

    /// Shared boilerplate that is imported once per destination and reused by content.
    pub fn dedup_by_content(self) -> bool {
        matches!(self, Self::Media | Self::Theme)
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Self::Media | Self::EmbeddedWorkbook)
    }
}

#[derive(Debug, Clone)]
pub enum PartContent {
    Xml(XmlDocument),
    Binary(Vec<u8>),
}

/// One part of a package with its payload and outbound relationships.
#[derive(Debug, Clone)]
pub struct Part {
    pub path: String,
    pub role: PartRole,
    pub content: PartContent,
    pub relationships: Relationships,
}

impl Part {
    pub fn xml(path: &str, role: PartRole, doc: XmlDocument) -> Self {
        Self {
            path: path.to_string(),
            role,
            content: PartContent::Xml(doc),
            relationships: Relationships::new(),
        }
    }

    pub fn binary(path: &str, role: PartRole, data: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            role,
            content: PartContent::Binary(data),
            relationships: Relationships::new(),
        }
    }

    pub fn is_xml(&self) -> bool {
        matches!(self.content, PartContent::Xml(_))
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match &self.content {
            PartContent::Xml(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_xml_mut(&mut self) -> Option<&mut XmlDocument> {
        match &mut self.content {
            PartContent::Xml(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match &self.content {
            PartContent::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// Serialized payload, as it will be written to the archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match &self.content {
            PartContent::Xml(doc) => crate::xml::builder::serialize_bytes(doc),
            PartContent::Binary(data) => Ok(data.clone()),
        }
    }
}
