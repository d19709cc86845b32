// Command handler for: Rebind
//
// Keeps the base document's layout and line numbers and swaps in new
// intervals. The ranges file is either a JSON array of `{low, high}` or
// another annotation document whose bindings are all bounded.

use std::path::Path;

use miette::{IntoDiagnostic, WrapErr};

use rangesynth_engine::annotation::AnnotationDocument;
use rangesynth_engine::model::RangeAssignment;

fn read_ranges(path: &Path) -> miette::Result<RangeAssignment> {
    let text = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    if let Ok(ranges) = serde_json::from_str::<RangeAssignment>(&text) {
        return Ok(ranges);
    }
    let doc = AnnotationDocument::from_json_str(&text).map_err(|e| {
        miette::miette!(
            "{} is neither a range list nor an annotation document: {e}",
            path.display()
        )
    })?;
    doc.intervals()
        .iter()
        .map(|observed| {
            observed.bounded().ok_or_else(|| {
                miette::miette!("{} has an unbounded binding ({observed})", path.display())
            })
        })
        .collect()
}

pub(crate) fn run_rebind_command(base: &Path, ranges: &Path, out: &Path) -> miette::Result<()> {
    let doc = AnnotationDocument::read(base).into_diagnostic()?;
    let ranges = read_ranges(ranges)?;
    let rebound = doc.rebind(&ranges).into_diagnostic()?;
    rebound.write_atomic(out).into_diagnostic()?;
    println!("{} binding(s) -> {}", ranges.len(), out.display());
    Ok(())
}
