pub mod content_types;
pub mod ooxml;
pub mod parts;
pub mod paths;
pub mod relationships;

pub use content_types::{ContentTypes, Declaration};
pub use ooxml::{OoxmlPackage, RemovalPolicy};
pub use parts::{Part, PartContent, PartRole};
pub use relationships::{Relationship, Relationships, TargetMode};
