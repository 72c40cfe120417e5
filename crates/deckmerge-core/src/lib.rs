pub mod error;
pub mod xml;
pub mod hash;
pub mod package;
pub mod allocator;
pub mod graph;
pub mod presentation;
pub mod import;
pub mod resolver;
pub mod chart;
pub mod element;
pub mod settings;
pub mod result;
pub mod verify;
pub mod assembly;

#[cfg(test)]
#[path = "../tests/common/fixtures.rs"]
pub(crate) mod fixtures;

pub use error::{DeckMergeError, Result};

pub use assembly::{Assembly, Modification, SlideGenerator, SlideRequest};
pub use chart::{ChartCategory, ChartData, ChartSeries, ChartSyncReport};
pub use element::{ElementHandle, ElementInfo, ElementKind, ElementSelector, ShapeTree};
pub use import::Importer;
pub use package::{OoxmlPackage, RemovalPolicy};
pub use resolver::{LayoutMerge, PlaceholderBinding, PlaceholderKey};
pub use result::{AssemblyStatistics, ImportedSlide};
pub use settings::{AssemblySettings, LayoutStrategy, MasterMode, MergeOptions, MismatchPolicy};
pub use verify::{verify_package, VerificationReport, Violation};
