// Command handler for: Propagate

use std::path::Path;

use miette::IntoDiagnostic;

use rangesynth_engine::batch::{list_mutants, run_propagation_batch};
use rangesynth_engine::catalog::Catalog;
use rangesynth_engine::propagate::OffsetTable;

use super::helpers::write_json_artifact;

pub(crate) fn run_propagate_command(
    catalog: &Catalog,
    mutants_dir: Option<&Path>,
    mut mutant_ids: Vec<String>,
    configs: &Path,
    offsets: &Path,
    out: &Path,
    report_path: Option<&Path>,
) -> miette::Result<()> {
    if let Some(dir) = mutants_dir {
        mutant_ids.extend(list_mutants(dir).into_diagnostic()?);
    }
    if mutant_ids.is_empty() {
        miette::bail!("No mutants given; use --mutants <dir> or --mutant <id>");
    }
    let offsets = OffsetTable::read(offsets).into_diagnostic()?;

    let report =
        run_propagation_batch(&mutant_ids, configs, &offsets, catalog, out).into_diagnostic()?;

    for item in &report.skipped {
        eprintln!("skipped {}: {}", item.item, item.reason);
    }
    println!(
        "{} written, {} skipped",
        report.written.len(),
        report.skipped.len()
    );
    if let Some(path) = report_path {
        write_json_artifact(path, &report)?;
    }
    Ok(())
}
