// Command handler for: Reanchor

use std::path::Path;

use miette::IntoDiagnostic;

use rangesynth_engine::annotation::AnnotationDocument;
use rangesynth_engine::propagate::reanchor;

pub(crate) fn run_reanchor_command(input: &Path, offset: i64, out: &Path) -> miette::Result<()> {
    let doc = AnnotationDocument::read(input).into_diagnostic()?;
    let moved = reanchor(&doc, offset);
    moved.write_atomic(out).into_diagnostic()?;
    println!(
        "{} event(s) shifted by {offset} -> {}",
        moved.events().len(),
        out.display()
    );
    Ok(())
}
