use crate::error::Result;
use crate::package::{OoxmlPackage, PartRole};
use crate::presentation;
use crate::resolver::LayoutMerge;
use serde::{Deserialize, Serialize};

/// Part counts of a presentation package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStatistics {
    pub slides: usize,
    pub masters: usize,
    pub layouts: usize,
    pub images: usize,
    pub charts: usize,
    pub embedded_workbooks: usize,
    pub notes_slides: usize,
    pub parts: usize,
}

impl AssemblyStatistics {
    pub fn collect(pkg: &OoxmlPackage) -> Result<Self> {
        let count = |role: PartRole| pkg.parts().filter(|p| p.role == role).count();
        Ok(Self {
            slides: presentation::slides(pkg)?.len(),
            masters: presentation::master_paths(pkg)?.len(),
            layouts: count(PartRole::SlideLayout),
            images: count(PartRole::Media),
            charts: count(PartRole::Chart),
            embedded_workbooks: count(PartRole::EmbeddedWorkbook),
            notes_slides: count(PartRole::NotesSlide),
            parts: pkg.parts().count(),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Outcome of one slide import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedSlide {
    pub source: String,
    /// 1-based slide number in the source.
    pub source_slide: usize,
    pub path: String,
    pub slide_id: u32,
    pub layout: String,
    pub master: String,
    pub master_imported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_merge: Option<LayoutMerge>,
    /// Parts created in the destination by this import.
    pub created_parts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::PackageBuilder;

    #[test]
    fn statistics_count_parts_by_role() {
        let pkg = OoxmlPackage::open(&PackageBuilder::deck(3).with_chart().build()).unwrap();
        let stats = AssemblyStatistics::collect(&pkg).unwrap();
        assert_eq!(stats.slides, 3);
        assert_eq!(stats.masters, 1);
        assert_eq!(stats.layouts, 2);
        assert_eq!(stats.images, 1);
        assert_eq!(stats.charts, 1);
        assert_eq!(stats.embedded_workbooks, 1);
    }
}
