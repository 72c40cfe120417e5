use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckMergeError {
    #[error("Malformed package: {message}")]
    MalformedPackage { message: String },

    #[error("Relationship '{rel_id}' of part '{part}' points at missing target '{target}'")]
    UnresolvableRelationship {
        part: String,
        rel_id: String,
        target: String,
    },

    #[error("Element {selector} not found in '{part}'")]
    ElementNotFound { selector: String, part: String },

    #[error("Identifier allocation failed: {message}")]
    IdentifierAllocation { message: String },

    #[error("No layout could be bound for slide '{slide}': {reason}")]
    UnboundLayout { slide: String, reason: String },

    #[error("Part '{part_path}' is still referenced by {referenced_by:?}")]
    PartInUse {
        part_path: String,
        referenced_by: Vec<String>,
    },

    #[error("Missing required part '{part_path}'")]
    MissingPart { part_path: String },

    #[error("Unknown source package '{name}'")]
    UnknownSource { name: String },

    #[error("Invalid chart data: {message}")]
    ChartData { message: String },

    #[error("XML parsing error at {location}: {message}")]
    XmlParse { message: String, location: String },

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl DeckMergeError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPackage {
            message: message.into(),
        }
    }

    pub fn missing_part(part_path: impl Into<String>) -> Self {
        Self::MissingPart {
            part_path: part_path.into(),
        }
    }

    pub fn unbound_layout(slide: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnboundLayout {
            slide: slide.into(),
            reason: reason.into(),
        }
    }

    pub fn allocation(message: impl Into<String>) -> Self {
        Self::IdentifierAllocation {
            message: message.into(),
        }
    }

    /// Stable diagnostic code, used by the CLI and in JSON reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPackage { .. } => "DM001",
            Self::UnresolvableRelationship { .. } => "DM002",
            Self::ElementNotFound { .. } => "DM003",
            Self::IdentifierAllocation { .. } => "DM004",
            Self::UnboundLayout { .. } => "DM005",
            Self::PartInUse { .. } => "DM006",
            Self::MissingPart { .. } => "DM007",
            Self::UnknownSource { .. } => "DM008",
            Self::ChartData { .. } => "DM009",
            Self::XmlParse { .. } => "DM010",
            Self::XmlWrite(_) => "DM011",
            Self::Io(_) => "DM012",
            Self::Zip(_) => "DM013",
        }
    }

    /// True for failures after which the session may keep issuing imports.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IdentifierAllocation { .. })
    }
}

pub type Result<T> = std::result::Result<T, DeckMergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        let err = DeckMergeError::malformed("missing [Content_Types].xml");
        assert_eq!(
            err.to_string(),
            "Malformed package: missing [Content_Types].xml"
        );
    }

    #[test]
    fn unresolvable_relationship_names_all_parts() {
        let err = DeckMergeError::UnresolvableRelationship {
            part: "ppt/slides/slide1.xml".to_string(),
            rel_id: "rId4".to_string(),
            target: "ppt/media/image9.png".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("rId4"));
        assert!(text.contains("ppt/slides/slide1.xml"));
        assert!(text.contains("ppt/media/image9.png"));
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DeckMergeError::malformed("x"),
            DeckMergeError::missing_part("x"),
            DeckMergeError::unbound_layout("x", "y"),
            DeckMergeError::allocation("x"),
            DeckMergeError::UnknownSource { name: "x".into() },
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn allocation_failures_are_fatal() {
        assert!(!DeckMergeError::allocation("exhausted").is_recoverable());
        assert!(DeckMergeError::unbound_layout("s", "r").is_recoverable());
    }
}
