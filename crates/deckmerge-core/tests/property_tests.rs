//! Package Invariant Property Tests
//!
//! Random sequences of session operations must always write a package with
//! closed relationships, complete content types and unique slide ids.

mod common;

use common::fixtures::PackageBuilder;
use deckmerge_core::allocator::{MAX_SLIDE_ID, MIN_SLIDE_ID};
use deckmerge_core::presentation;
use deckmerge_core::{verify_package, Assembly, AssemblySettings, OoxmlPackage};
use proptest::prelude::*;
use std::collections::BTreeSet;

const SOURCES: [(&str, usize); 3] = [("plain", 3), ("rich", 3), ("brand", 2)];

#[derive(Debug, Clone)]
enum Op {
    Add { source: usize, slide: usize },
    Remove(usize),
    Move(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..SOURCES.len(), 1..=3usize).prop_map(|(source, slide)| Op::Add { source, slide }),
        1 => (1..=8usize).prop_map(Op::Remove),
        1 => (1..=8usize, 1..=8usize).prop_map(|(from, to)| Op::Move(from, to)),
    ]
}

fn new_session() -> Assembly {
    let mut assembly = Assembly::from_bytes(
        &PackageBuilder::deck(1).with_core_properties().build(),
        AssemblySettings::default(),
    )
    .unwrap();
    let builders = [
        PackageBuilder::deck(3),
        PackageBuilder::deck(3).with_notes().with_chart().image_seed(3),
        PackageBuilder::deck(2)
            .master_name("Brand")
            .with_slide_jump()
            .picture_on_all(),
    ];
    for ((name, _), builder) in SOURCES.iter().zip(builders) {
        assembly.load_source(name, &builder.build()).unwrap();
    }
    assembly
}

fn apply(assembly: &mut Assembly, op: &Op) {
    let count = assembly.slide_paths().unwrap().len();
    match *op {
        Op::Add { source, slide } => {
            let (name, slides) = SOURCES[source];
            assembly.add_slide(name, slide.min(slides)).unwrap();
        }
        Op::Remove(n) if n <= count => {
            assembly.remove_slide(n).unwrap();
        }
        Op::Move(from, to) if from <= count && to <= count => {
            assembly.move_slide(from, to).unwrap();
        }
        _ => {}
    }
}

fn slide_ids(pkg: &OoxmlPackage) -> Vec<u32> {
    presentation::slides(pkg).unwrap().iter().map(|s| s.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn written_package_keeps_invariants(ops in prop::collection::vec(op(), 1..10)) {
        let mut assembly = new_session();
        for op in &ops {
            apply(&mut assembly, op);
        }
        let expected_slides = assembly.slide_paths().unwrap().len();

        let output = OoxmlPackage::open(&assembly.write().unwrap()).unwrap();
        let report = verify_package(&output).unwrap();
        prop_assert!(report.is_valid(), "{:?} after {:?}", report.violations, ops);

        let ids = slide_ids(&output);
        prop_assert_eq!(ids.len(), expected_slides);
        let unique: BTreeSet<u32> = ids.iter().copied().collect();
        prop_assert_eq!(unique.len(), ids.len());
        prop_assert!(ids.iter().all(|id| (MIN_SLIDE_ID..=MAX_SLIDE_ID).contains(id)));

        for part in output.parts() {
            prop_assert!(output.content_type_of(&part.path).is_some(), "{} has no content type", part.path);
        }
    }

    #[test]
    fn every_import_is_closed_before_write(ops in prop::collection::vec(op(), 1..8)) {
        let mut assembly = new_session();
        for op in &ops {
            apply(&mut assembly, op);
            let pkg = assembly.package();
            for slide in assembly.slide_paths().unwrap() {
                for (_, target) in pkg.internal_targets(&slide) {
                    prop_assert!(pkg.contains(&target), "{} -> {} is dangling", slide, target);
                }
            }
        }
    }
}
