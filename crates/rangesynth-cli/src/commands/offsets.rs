// Command handler for: Offsets
//
// Reads each base contract's canonical annotation and records the line of its
// BEGIN record.

use std::path::Path;

use miette::IntoDiagnostic;

use rangesynth_engine::batch::discover_offsets;

pub(crate) fn run_offsets_command(
    annotations: &Path,
    contracts: &[String],
    out: &Path,
) -> miette::Result<()> {
    let (table, skipped) = discover_offsets(annotations, contracts).into_diagnostic()?;
    for item in &skipped {
        eprintln!("skipped {}: {}", item.item, item.reason);
    }
    if table.is_empty() {
        miette::bail!(
            "No base annotation in {} has a BEGIN record",
            annotations.display()
        );
    }
    table.write(out).into_diagnostic()?;
    for contract in table.contracts() {
        if let Some(anchor) = table.anchor(contract) {
            println!("{contract}: {anchor}");
        }
    }
    println!("{} contract(s) -> {}", table.len(), out.display());
    Ok(())
}
