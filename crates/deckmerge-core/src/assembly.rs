//! An assembly session: one destination package built up from slides of
//! any number of source packages.
//!
//! Every mutating call is one transaction on the destination. When it fails,
//! the destination is rolled back to its state before the call and the
//! session stays usable.

use crate::chart::{self, ChartData, ChartSyncReport};
use crate::element::{self, ElementHandle, ElementSelector};
use crate::error::{DeckMergeError, Result};
use crate::import::Importer;
use crate::package::paths;
use crate::package::relationships::relationship_types as rt;
use crate::package::{OoxmlPackage, RemovalPolicy};
use crate::presentation;
use crate::resolver;
use crate::result::{AssemblyStatistics, ImportedSlide};
use crate::settings::{AssemblySettings, LayoutStrategy};
use crate::verify::verify_package;
use crate::xml::namespaces::{DCTERMS, XSI};
use crate::xml::{XAttribute, XmlNodeData};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

/// Callback applied to one located element of an imported slide.
pub type Modification = Box<dyn FnOnce(&mut ElementHandle<'_>) -> Result<()>>;

/// Produces a throwaway package whose slides are imported like any source.
pub trait SlideGenerator {
    fn generate(&self) -> Result<Vec<u8>>;
}

/// One slide to import, with optional per-slide overrides.
pub struct SlideRequest {
    pub source: String,
    /// 1-based slide number in the source.
    pub slide: usize,
    pub layout: Option<LayoutStrategy>,
    modifications: Vec<(ElementSelector, Modification)>,
}

impl SlideRequest {
    pub fn new(source: impl Into<String>, slide: usize) -> Self {
        Self {
            source: source.into(),
            slide,
            layout: None,
            modifications: Vec::new(),
        }
    }

    pub fn with_layout(mut self, strategy: LayoutStrategy) -> Self {
        self.layout = Some(strategy);
        self
    }

    /// Queues `modify` for the element matching `selector`; modifications run
    /// in order once the slide is attached.
    pub fn modify<F>(mut self, selector: ElementSelector, modify: F) -> Self
    where
        F: FnOnce(&mut ElementHandle<'_>) -> Result<()> + 'static,
    {
        self.modifications.push((selector, Box::new(modify)));
        self
    }
}

pub struct Assembly {
    package: OoxmlPackage,
    sources: BTreeMap<String, OoxmlPackage>,
    settings: AssemblySettings,
    imported: Vec<ImportedSlide>,
    generated: usize,
}

impl Assembly {
    pub fn new(root: OoxmlPackage, settings: AssemblySettings) -> Result<Self> {
        let mut assembly = Self {
            package: root,
            sources: BTreeMap::new(),
            settings,
            imported: Vec::new(),
            generated: 0,
        };
        if assembly.settings.remove_existing_slides {
            let count = presentation::slides(&assembly.package)?.len();
            for n in (1..=count).rev() {
                assembly.remove_slide(n)?;
            }
            debug!("removed {count} existing slides from the root package");
        }
        Ok(assembly)
    }

    pub fn from_bytes(bytes: &[u8], settings: AssemblySettings) -> Result<Self> {
        Self::new(OoxmlPackage::open_named("root", bytes)?, settings)
    }

    pub fn open_file(path: impl AsRef<Path>, settings: AssemblySettings) -> Result<Self> {
        Self::new(OoxmlPackage::open_file(path)?, settings)
    }

    pub fn load_source(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let source = OoxmlPackage::open_named(name, bytes)?;
        self.add_source(name, source);
        Ok(())
    }

    pub fn load_source_file(&mut self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.load_source(name, &bytes)
    }

    /// Registers an already opened package as a source. A source loaded
    /// under the same name earlier is replaced.
    pub fn add_source(&mut self, name: &str, source: OoxmlPackage) {
        if self.sources.insert(name.to_string(), source).is_some() {
            debug!("source '{name}' replaced");
        }
    }

    pub fn settings(&self) -> &AssemblySettings {
        &self.settings
    }

    pub fn package(&self) -> &OoxmlPackage {
        &self.package
    }

    pub fn into_package(self) -> OoxmlPackage {
        self.package
    }

    pub fn source(&self, name: &str) -> Option<&OoxmlPackage> {
        self.sources.get(name)
    }

    /// Every slide imported so far, in call order.
    pub fn imported(&self) -> &[ImportedSlide] {
        &self.imported
    }

    pub fn slide_paths(&self) -> Result<Vec<String>> {
        presentation::slide_paths(&self.package)
    }

    pub fn statistics(&self) -> Result<AssemblyStatistics> {
        AssemblyStatistics::collect(&self.package)
    }

    /// Appends slide `slide` (1-based) of source `source` to the destination.
    pub fn add_slide(&mut self, source: &str, slide: usize) -> Result<&ImportedSlide> {
        self.add_slide_with(SlideRequest::new(source, slide))
    }

    pub fn add_slide_with(&mut self, request: SlideRequest) -> Result<&ImportedSlide> {
        let source = self
            .sources
            .get(&request.source)
            .ok_or_else(|| DeckMergeError::UnknownSource {
                name: request.source.clone(),
            })?;
        let strategy = request
            .layout
            .unwrap_or_else(|| self.settings.default_layout_strategy.clone());

        self.package.begin();
        let result = import_slide(
            &mut self.package,
            source,
            request.slide,
            &self.settings,
            &strategy,
            request.modifications,
        );
        let imported = match result {
            Ok(imported) => {
                self.package.commit();
                imported
            }
            Err(e) => {
                self.package.rollback();
                return Err(e);
            }
        };
        info!(
            "added slide {} of '{}' as '{}' (id {})",
            imported.source_slide, imported.source, imported.path, imported.slide_id
        );
        self.imported.push(imported);
        self.imported
            .last()
            .ok_or_else(|| DeckMergeError::missing_part("imported slide"))
    }

    /// Imports master `master` (1-based) of `source` with all its layouts.
    pub fn add_master(&mut self, source: &str, master: usize) -> Result<String> {
        let source_pkg = self
            .sources
            .get(source)
            .ok_or_else(|| DeckMergeError::UnknownSource {
                name: source.to_string(),
            })?;
        let source_master = nth(presentation::master_paths(source_pkg)?, master, "master")?;

        self.package.begin();
        let mut importer =
            Importer::new(source_pkg).with_media_prefix(self.settings.media_name_prefix.clone());
        match importer.import_part(&mut self.package, &source_master) {
            Ok(path) => {
                self.package.commit();
                info!("added master '{source_master}' of '{source}' as '{path}'");
                Ok(path)
            }
            Err(e) => {
                self.package.rollback();
                Err(e)
            }
        }
    }

    /// Imports every slide the generator produces and gives each generated
    /// element a creation id. Either every slide is added or none is; the
    /// generated package is dropped from the sources afterwards.
    pub fn add_generated(&mut self, generator: &dyn SlideGenerator) -> Result<Vec<ImportedSlide>> {
        let bytes = generator.generate()?;
        self.generated += 1;
        let name = format!("generated-{}", self.generated);
        let source = OoxmlPackage::open_named(&name, &bytes)?;
        let count = presentation::slides(&source)?.len();
        self.add_source(&name, source);

        let imported_before = self.imported.len();
        self.package.begin();
        let result = self.import_generated(&name, count);
        self.sources.remove(&name);
        match result {
            Ok(added) => {
                self.package.commit();
                Ok(added)
            }
            Err(e) => {
                self.package.rollback();
                self.imported.truncate(imported_before);
                Err(e)
            }
        }
    }

    fn import_generated(&mut self, name: &str, count: usize) -> Result<Vec<ImportedSlide>> {
        let mut added = Vec::with_capacity(count);
        for n in 1..=count {
            let imported = self.add_slide(name, n)?.clone();
            let assigned = element::ensure_creation_ids(self.package.xml_mut(&imported.path)?);
            debug!("'{}': {assigned} creation ids assigned", imported.path);
            added.push(imported);
        }
        Ok(added)
    }

    /// Runs `modify` on the element of destination slide `slide` (1-based)
    /// matching `selector`.
    pub fn modify_element<F>(&mut self, slide: usize, selector: &ElementSelector, modify: F) -> Result<()>
    where
        F: FnOnce(&mut ElementHandle<'_>) -> Result<()>,
    {
        let path = self.slide_path(slide)?;
        self.package.begin();
        match apply_modification(&mut self.package, &path, selector, modify) {
            Ok(()) => {
                self.package.commit();
                Ok(())
            }
            Err(e) => {
                self.package.rollback();
                Err(e)
            }
        }
    }

    /// Replaces the data of the chart behind element `selector` on slide `slide`.
    pub fn set_chart_data(
        &mut self,
        slide: usize,
        selector: &ElementSelector,
        data: &ChartData,
    ) -> Result<ChartSyncReport> {
        let path = self.slide_path(slide)?;
        let node = element::find_element(self.package.xml(&path)?, &path, selector)?;
        let parts = element::chart_of(&self.package, &path, node)?.ok_or_else(|| {
            DeckMergeError::ChartData {
                message: format!("element {selector} on '{path}' is not a chart"),
            }
        })?;

        self.package.begin();
        match chart::set_chart_data(
            &mut self.package,
            &parts.chart,
            data,
            self.settings.chart_mismatch_policy,
        ) {
            Ok(report) => {
                self.package.commit();
                Ok(report)
            }
            Err(e) => {
                self.package.rollback();
                Err(e)
            }
        }
    }

    /// Moves slide `from` to position `to` (both 1-based).
    pub fn move_slide(&mut self, from: usize, to: usize) -> Result<()> {
        if from == 0 || to == 0 {
            return Err(DeckMergeError::missing_part("slide 0"));
        }
        presentation::move_slide(&mut self.package, from - 1, to - 1)
    }

    /// Removes slide `slide` (1-based) together with its notes slide.
    pub fn remove_slide(&mut self, slide: usize) -> Result<String> {
        let path = self.slide_path(slide)?;
        let notes = self
            .package
            .internal_targets(&path)
            .into_iter()
            .find(|(rel, _)| rel.rel_type == rt::NOTES_SLIDE)
            .map(|(_, target)| target);

        self.package.begin();
        let result = remove_slide_parts(&mut self.package, &path, notes.as_deref());
        match result {
            Ok(()) => {
                self.package.commit();
                info!("removed slide {slide} ('{path}')");
                Ok(path)
            }
            Err(e) => {
                self.package.rollback();
                Err(e)
            }
        }
    }

    /// Finalizes the destination and serializes it. A failure leaves the
    /// destination as it was before the call.
    pub fn write(&mut self) -> Result<Vec<u8>> {
        self.package.begin();
        let finalized = self.finalize().and_then(|()| self.package.save());
        let bytes = match finalized {
            Ok(bytes) => {
                self.package.commit();
                bytes
            }
            Err(e) => {
                self.package.rollback();
                return Err(e);
            }
        };
        info!(
            "wrote '{}': {} slides, {} bytes",
            self.package.name(),
            presentation::slides(&self.package)?.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    fn finalize(&mut self) -> Result<()> {
        if self.settings.cleanup_unreferenced_parts {
            let removed = remove_unreachable_parts(&mut self.package)?;
            if !removed.is_empty() {
                debug!("removed {} unreferenced parts", removed.len());
            }
        }
        if self.settings.update_core_properties {
            stamp_modified(&mut self.package)?;
        }
        if self.settings.verify_on_write {
            let report = verify_package(&self.package)?;
            if let Some(first) = report.violations.first() {
                return Err(DeckMergeError::malformed(format!(
                    "assembled package has {} violation(s), first: {first}",
                    report.violations.len()
                )));
            }
        }
        Ok(())
    }

    pub fn write_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.write()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Like [`Assembly::write_file`], with the file write as one async step.
    #[cfg(feature = "async")]
    pub async fn write_file_async(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.write()?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    fn slide_path(&self, slide: usize) -> Result<String> {
        nth(presentation::slide_paths(&self.package)?, slide, "slide")
    }
}

/// The 1-based `n`th entry of `items`.
fn nth(items: Vec<String>, n: usize, what: &str) -> Result<String> {
    n.checked_sub(1)
        .and_then(|i| items.into_iter().nth(i))
        .ok_or_else(|| DeckMergeError::missing_part(format!("{what} {n}")))
}

fn import_slide(
    dest: &mut OoxmlPackage,
    source: &OoxmlPackage,
    slide: usize,
    settings: &AssemblySettings,
    strategy: &LayoutStrategy,
    modifications: Vec<(ElementSelector, Modification)>,
) -> Result<ImportedSlide> {
    let source_slide = nth(presentation::slide_paths(source)?, slide, "slide")?;
    let mut importer = Importer::new(source).with_media_prefix(settings.media_name_prefix.clone());
    let resolution = resolver::resolve_layout(
        dest,
        &mut importer,
        &source_slide,
        settings.master_mode,
        strategy,
    )?;
    let (path, slide_id) = importer.import_slide(dest, &source_slide)?;

    for (selector, modify) in modifications {
        apply_modification(dest, &path, &selector, modify)?;
    }

    Ok(ImportedSlide {
        source: source.name().to_string(),
        source_slide: slide,
        path,
        slide_id,
        layout: resolution.layout,
        master: resolution.master,
        master_imported: resolution.master_imported,
        layout_merge: resolution.merge,
        created_parts: importer.created().to_vec(),
    })
}

fn apply_modification<F>(pkg: &mut OoxmlPackage, part: &str, selector: &ElementSelector, modify: F) -> Result<()>
where
    F: FnOnce(&mut ElementHandle<'_>) -> Result<()>,
{
    let node = element::find_element(pkg.xml(part)?, part, selector)?;
    let chart = element::chart_of(pkg, part, node)?;
    let mut handle = ElementHandle::new(part, pkg.xml_mut(part)?, node, chart);
    modify(&mut handle)
}

fn remove_slide_parts(pkg: &mut OoxmlPackage, slide: &str, notes: Option<&str>) -> Result<()> {
    pkg.remove_part(slide, RemovalPolicy::CascadeRelationships)?;
    if let Some(notes) = notes {
        if pkg.contains(notes) && pkg.referencing(notes).is_empty() {
            pkg.remove_part(notes, RemovalPolicy::CascadeRelationships)?;
        }
    }
    Ok(())
}

/// Removes every part that cannot be reached from the package root relationships.
fn remove_unreachable_parts(pkg: &mut OoxmlPackage) -> Result<Vec<String>> {
    let mut reachable: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = pkg
        .internal_targets("")
        .into_iter()
        .map(|(_, target)| target)
        .collect();
    while let Some(path) = queue.pop_front() {
        if !pkg.contains(&path) || !reachable.insert(path.clone()) {
            continue;
        }
        queue.extend(pkg.internal_targets(&path).into_iter().map(|(_, target)| target));
    }

    let orphans: Vec<String> = pkg
        .part_paths()
        .filter(|p| !reachable.contains(*p))
        .cloned()
        .collect();
    for orphan in &orphans {
        // an earlier removal may have cascaded into it
        if pkg.contains(orphan) {
            pkg.remove_part(orphan, RemovalPolicy::CascadeRelationships)?;
        }
    }
    Ok(orphans)
}

fn stamp_modified(pkg: &mut OoxmlPackage) -> Result<()> {
    let core = pkg
        .relationships("")
        .and_then(|rels| rels.first_of_type(rt::CORE_PROPERTIES))
        .map(|rel| paths::resolve_target("", &rel.target));
    let Some(core) = core.filter(|c| pkg.contains(c)) else {
        return Ok(());
    };
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let doc = pkg.xml_mut(&core)?;
    let root = doc
        .root()
        .ok_or_else(|| DeckMergeError::malformed(format!("part '{core}' is empty")))?;
    doc.ensure_root_namespace("dcterms", DCTERMS::NS);
    doc.ensure_root_namespace("xsi", XSI::NS);
    let modified = match doc.find_child(root, &DCTERMS::modified()) {
        Some(existing) => existing,
        None => doc.add_child(
            root,
            XmlNodeData::element_with_attrs(
                DCTERMS::modified(),
                vec![XAttribute::new(XSI::r#type(), "dcterms:W3CDTF")],
            ),
        ),
    };
    doc.set_text(modified, &now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::PackageBuilder;
    use crate::settings::MasterMode;
    use crate::xml::namespaces::A;
    use pretty_assertions::assert_eq;

    fn session(root: PackageBuilder) -> Assembly {
        let mut assembly = Assembly::from_bytes(&root.build(), AssemblySettings::default()).unwrap();
        assembly
            .load_source("deck", &PackageBuilder::deck(3).with_chart().with_notes().build())
            .unwrap();
        assembly
    }

    #[test]
    fn unknown_source_is_reported() {
        let mut assembly = session(PackageBuilder::deck(1));
        let err = assembly.add_slide("nope", 1).unwrap_err();
        assert!(matches!(err, DeckMergeError::UnknownSource { name } if name == "nope"));
    }

    #[test]
    fn slide_numbers_are_one_based() {
        let mut assembly = session(PackageBuilder::deck(1));
        assert!(matches!(
            assembly.add_slide("deck", 0).unwrap_err(),
            DeckMergeError::MissingPart { .. }
        ));
        assert!(matches!(
            assembly.add_slide("deck", 4).unwrap_err(),
            DeckMergeError::MissingPart { .. }
        ));
        assert_eq!(assembly.slide_paths().unwrap().len(), 1);
    }

    #[test]
    fn added_slide_reuses_matching_master() {
        let mut assembly = session(PackageBuilder::deck(1));
        let imported = assembly.add_slide("deck", 2).unwrap().clone();
        assert_eq!(imported.source_slide, 2);
        assert_eq!(imported.slide_id, 257);
        assert!(!imported.master_imported);
        assert_eq!(imported.master, "ppt/slideMasters/slideMaster1.xml");
        assert_eq!(assembly.statistics().unwrap().masters, 1);
    }

    #[test]
    fn explicit_mode_requires_master_up_front() {
        let settings = AssemblySettings::default().with_master_mode(MasterMode::Explicit);
        let mut assembly = Assembly::from_bytes(&PackageBuilder::deck(1).build(), settings).unwrap();
        assembly
            .load_source("brand", &PackageBuilder::deck(1).master_name("Brand").build())
            .unwrap();
        let before = assembly.package().part_digests().unwrap();

        let err = assembly.add_slide("brand", 1).unwrap_err();
        assert!(matches!(err, DeckMergeError::UnboundLayout { .. }));
        assert_eq!(assembly.package().part_digests().unwrap(), before);

        let master = assembly.add_master("brand", 1).unwrap();
        let imported = assembly.add_slide("brand", 1).unwrap();
        assert_eq!(imported.master, master);
        assert!(!imported.master_imported);
    }

    #[test]
    fn modifications_run_after_attach() {
        let mut assembly = session(PackageBuilder::deck(1));
        let request = SlideRequest::new("deck", 1).modify(ElementSelector::name("Title 1"), |el| {
            el.set_text("Quarterly numbers");
            Ok(())
        });
        let path = assembly.add_slide_with(request).unwrap().path.clone();

        let doc = assembly.package().xml(&path).unwrap();
        let texts: Vec<String> = doc
            .descendants_named(doc.root().unwrap(), &A::t())
            .into_iter()
            .map(|t| doc.text(t))
            .collect();
        assert!(texts.contains(&"Quarterly numbers".to_string()));
    }

    #[test]
    fn failed_modification_rolls_back_the_slide() {
        let mut assembly = session(PackageBuilder::deck(1));
        let before = assembly.package().part_digests().unwrap();
        let request = SlideRequest::new("deck", 1).modify(ElementSelector::name("No Such Shape"), |_| Ok(()));

        let err = assembly.add_slide_with(request).unwrap_err();
        assert!(matches!(err, DeckMergeError::ElementNotFound { .. }));
        assert_eq!(assembly.package().part_digests().unwrap(), before);
        assert!(assembly.imported().is_empty());

        assembly.add_slide("deck", 1).unwrap();
        assert_eq!(assembly.slide_paths().unwrap().len(), 2);
    }

    #[test]
    fn removing_a_slide_drops_its_notes() {
        let mut assembly = session(PackageBuilder::deck(1));
        let imported = assembly.add_slide("deck", 1).unwrap().clone();
        let notes: Vec<String> = imported
            .created_parts
            .iter()
            .filter(|p| p.starts_with("ppt/notesSlides/"))
            .cloned()
            .collect();
        assert_eq!(notes.len(), 1);

        let removed = assembly.remove_slide(2).unwrap();
        assert_eq!(removed, imported.path);
        assert!(!assembly.package().contains(&imported.path));
        assert!(!assembly.package().contains(&notes[0]));
        assert!(assembly.package().content_types().override_for(&imported.path).is_none());
    }

    #[test]
    fn move_slide_is_one_based() {
        let mut assembly = session(PackageBuilder::deck(2));
        let before = assembly.slide_paths().unwrap();
        assembly.move_slide(2, 1).unwrap();
        let after = assembly.slide_paths().unwrap();
        assert_eq!(after, vec![before[1].clone(), before[0].clone()]);
        assert!(assembly.move_slide(0, 1).is_err());
    }

    #[test]
    fn remove_existing_slides_starts_empty() {
        let settings = AssemblySettings::default().with_remove_existing_slides(true);
        let assembly = Assembly::from_bytes(&PackageBuilder::deck(3).build(), settings).unwrap();
        assert!(assembly.slide_paths().unwrap().is_empty());
    }

    #[test]
    fn write_cleans_orphans_and_verifies() {
        let mut assembly = session(PackageBuilder::deck(2));
        assembly.remove_slide(1).unwrap();
        // slide 1 held the only reference to the image
        assert!(assembly.package().contains("ppt/media/image1.png"));

        let bytes = assembly.write().unwrap();
        let written = OoxmlPackage::open(&bytes).unwrap();
        assert!(!written.contains("ppt/media/image1.png"));
        assert!(verify_package(&written).unwrap().is_valid());
    }

    #[test]
    fn write_stamps_modified_time() {
        let mut assembly = session(PackageBuilder::deck(1).with_core_properties());
        let bytes = assembly.write().unwrap();
        let written = OoxmlPackage::open(&bytes).unwrap();
        let doc = written.xml("docProps/core.xml").unwrap();
        let modified = doc.find_descendant(doc.root().unwrap(), &DCTERMS::modified()).unwrap();
        let stamp = doc.text(modified);
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok(), "{stamp}");
        let w3cdtf = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$").unwrap();
        assert!(w3cdtf.is_match(&stamp), "{stamp}");
    }

    #[test]
    fn failed_write_leaves_the_destination_untouched() {
        let mut assembly = session(PackageBuilder::deck(2).with_core_properties());
        assembly.remove_slide(1).unwrap();
        let slide = assembly.slide_path(1).unwrap();
        assembly
            .package
            .add_relationship(&slide, rt::IMAGE, "ppt/media/missing.png")
            .unwrap();
        let before = assembly.package().part_digests().unwrap();

        let err = assembly.write().unwrap_err();
        assert!(matches!(err, DeckMergeError::MalformedPackage { .. }));
        assert_eq!(assembly.package().part_digests().unwrap(), before);
        assert!(assembly.package().contains("ppt/media/image1.png"));
        assert!(!assembly.package().in_transaction());
    }

    struct OneSlide;

    impl SlideGenerator for OneSlide {
        fn generate(&self) -> Result<Vec<u8>> {
            Ok(PackageBuilder::deck(1).build())
        }
    }

    #[test]
    fn generated_slides_get_creation_ids() {
        let mut assembly = session(PackageBuilder::deck(1));
        let added = assembly.add_generated(&OneSlide).unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].source, "generated-1");

        let doc = assembly.package().xml(&added[0].path).unwrap();
        let elements = element::list_elements(doc);
        assert!(!elements.is_empty());
        assert!(elements.iter().all(|e| e.creation_id.is_some()));
    }

    /// Three slides whose last one has lost its layout relationship.
    struct BrokenThirdSlide;

    impl SlideGenerator for BrokenThirdSlide {
        fn generate(&self) -> Result<Vec<u8>> {
            let mut pkg = OoxmlPackage::open(&PackageBuilder::deck(3).master_name("Generated").build())?;
            pkg.relationships_mut("ppt/slides/slide3.xml")?.remove("rId1");
            pkg.save()
        }
    }

    #[test]
    fn generated_import_is_all_or_nothing() {
        let mut assembly = session(PackageBuilder::deck(1));
        let before = assembly.package().part_digests().unwrap();
        let masters = presentation::master_paths(assembly.package()).unwrap();

        let err = assembly.add_generated(&BrokenThirdSlide).unwrap_err();
        assert!(matches!(err, DeckMergeError::UnboundLayout { .. }));
        assert_eq!(assembly.package().part_digests().unwrap(), before);
        assert_eq!(presentation::master_paths(assembly.package()).unwrap(), masters);
        assert_eq!(assembly.slide_paths().unwrap().len(), 1);
        assert!(assembly.imported().is_empty());
        assert!(assembly.source("generated-1").is_none());

        let added = assembly.add_generated(&OneSlide).unwrap();
        assert_eq!(added[0].source, "generated-2");
        assert!(assembly.source("generated-2").is_none());
        assert_eq!(assembly.imported().len(), 1);
    }
}
