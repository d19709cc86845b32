//! Synthesize, discover base offsets, then propagate onto mutants on disk.

use std::fs;

use rangesynth_engine::annotation::{AnnotationDocument, AnnotationEvent};
use rangesynth_engine::batch::{discover_offsets, list_mutants, run_propagation_batch, run_synthesis_batch};
use rangesynth_engine::catalog::Catalog;
use rangesynth_engine::config::BatchConfig;
use rangesynth_engine::model::{Interval, Pattern, RangeAssignment};
use rangesynth_engine::propagate::{MutantId, OffsetTable, PropagationError};
use rangesynth_smt::backends::z3_backend::Z3Solver;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn base_annotation(begin: i64) -> AnnotationDocument {
    AnnotationDocument::from_events(vec![
        AnnotationEvent::add("// @Debugging BEGIN", begin),
        AnnotationEvent::add("// @GlobalVar block.timestamp = [0,0];", begin + 1),
        AnnotationEvent::add("// @Debugging END", begin + 2),
    ])
}

#[test]
fn synthesized_documents_follow_their_mutants() -> TestResult {
    let root = tempfile::tempdir()?;
    let configs = root.path().join("configs");
    let annotations = root.path().join("annotations");
    let mutants_dir = root.path().join("mutants");
    let out = root.path().join("mutated");
    fs::create_dir_all(&annotations)?;
    fs::create_dir_all(&mutants_dir)?;

    let catalog = Catalog::builtin();
    let config = BatchConfig {
        targets: vec!["ThorusBond_c".into(), "PoolKeeper_c".into()],
        patterns: vec![Pattern::Overlap],
        deltas: vec![3],
        ..BatchConfig::default()
    };
    let synthesized = run_synthesis_batch(&catalog, &config, &configs, None, Z3Solver::new)?;
    assert_eq!(synthesized.generated.len(), 2);

    base_annotation(57).write_atomic(&annotations.join("ThorusBond_c_annot.json"))?;
    for name in [
        "ThorusBond_c_claimablePayout_sub_to_add",
        "ThorusBond_c_claimablePayout_swap_mul_div",
        "PoolKeeper_c_keeperTip_add_to_sub",
    ] {
        fs::write(mutants_dir.join(format!("{name}.sol")), "contract M {}")?;
    }

    let (offsets, missing) = discover_offsets(&annotations, &[])?;
    assert_eq!(offsets.anchor("ThorusBond_c"), Some(57));
    assert!(missing.is_empty());

    let mutants = list_mutants(&mutants_dir)?;
    let report = run_propagation_batch(&mutants, &configs, &offsets, &catalog, &out)?;
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].item, "PoolKeeper_c_keeperTip_add_to_sub");

    let base = AnnotationDocument::read(&configs.join("ThorusBond_c_overlap_3.json"))?;
    let moved = AnnotationDocument::read(
        &out.join("ThorusBond_c_claimablePayout_sub_to_add_overlap_3.json"),
    )?;
    assert_eq!(moved.begin_line(), Some(57));
    assert_eq!(moved.intervals(), base.intervals());
    for (a, b) in base.events().iter().zip(moved.events()) {
        assert_eq!(b.start_line - a.start_line, 56);
        assert_eq!(a.code, b.code);
    }
    Ok(())
}

#[test]
fn hub_pool_mutant_resolves_to_its_base() {
    let id = MutantId::parse("HubPool_c__allocateLpAndProtocolFees_swap_mul_div").unwrap();
    assert_eq!(id.base, "HubPool_c");
    assert!(matches!(
        MutantId::parse("HubPool__allocateLpAndProtocolFees_swap_mul_div"),
        Err(PropagationError::MalformedIdentifier { .. })
    ));
}

#[test]
fn missing_offset_is_reported_not_dropped() -> TestResult {
    let configs = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    base_annotation(1).write_atomic(&configs.path().join("Lock_c_overlap_1.json"))?;
    let report = run_propagation_batch(
        &["Lock_c_pending_sub_to_add".to_string()],
        configs.path(),
        &OffsetTable::new(),
        &Catalog::builtin(),
        out.path(),
    )?;
    assert!(report.written.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("Lock_c"));
    Ok(())
}

#[test]
fn rebinding_keeps_the_base_layout() -> TestResult {
    let base = base_annotation(40);
    let ranges: RangeAssignment = vec![Interval::new(1_700_000_000, 1_700_000_015).unwrap()]
        .into_iter()
        .collect();
    let rebound = base.rebind(&ranges)?;
    assert_eq!(rebound.begin_line(), Some(40));
    assert_eq!(
        rebound.events()[1].code,
        "// @GlobalVar block.timestamp = [1700000000,1700000015];"
    );
    Ok(())
}
