// Shared helper functions used across CLI command handlers.
//
// These parse CLI string arguments into typed values, load the catalog, build
// solvers and write JSON artifacts.

use std::path::Path;

use miette::{IntoDiagnostic, WrapErr};
use serde::Serialize;

use rangesynth_engine::catalog::Catalog;
use rangesynth_engine::model::Pattern;
use rangesynth_smt::backends::z3_backend::Z3Solver;

use crate::OutputFormat;

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => miette::bail!("Unknown output format: {other}. Use 'text' or 'json'."),
    }
}

pub(crate) fn parse_pattern(raw: &str) -> miette::Result<Pattern> {
    raw.parse::<Pattern>().map_err(|e| miette::miette!("{e}"))
}

/// Built-in catalog overlaid with the entries of `extra`, if given.
pub(crate) fn load_catalog(extra: Option<&Path>) -> miette::Result<Catalog> {
    let mut catalog = Catalog::builtin();
    if let Some(path) = extra {
        let entries = Catalog::read(path).into_diagnostic()?;
        tracing::info!(entries = entries.len(), path = %path.display(), "loaded catalog extension");
        catalog.merge(entries);
    }
    Ok(catalog)
}

pub(crate) fn make_solver(timeout_secs: Option<u64>) -> Z3Solver {
    match timeout_secs {
        Some(secs) => Z3Solver::with_timeout_secs(secs),
        None => Z3Solver::new(),
    }
}

pub(crate) fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> miette::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    std::fs::write(path, text)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", path.display()))
}
