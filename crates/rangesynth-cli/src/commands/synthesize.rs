// Command handler for: Synthesize
//
// Builds a batch configuration from an optional JSON file overlaid with CLI
// flags, runs the worker pool and reports what was written.

use std::path::Path;

use miette::IntoDiagnostic;

use rangesynth_engine::batch::run_synthesis_batch;
use rangesynth_engine::catalog::Catalog;
use rangesynth_engine::config::BatchConfig;

use super::helpers::{make_solver, parse_pattern, write_json_artifact};

/// CLI flags that replace the matching `BatchConfig` fields when given.
#[derive(Debug, Default)]
pub(crate) struct SynthesizeOverrides {
    pub(crate) targets: Vec<String>,
    pub(crate) patterns: Vec<String>,
    pub(crate) deltas: Vec<u32>,
    pub(crate) max_tries: Option<u32>,
    pub(crate) start_line: Option<i64>,
    pub(crate) workers: Option<usize>,
    pub(crate) timeout: Option<u64>,
}

fn effective_config(
    config_path: Option<&Path>,
    overrides: SynthesizeOverrides,
) -> miette::Result<BatchConfig> {
    let mut config = match config_path {
        Some(path) => BatchConfig::from_json_file(path).into_diagnostic()?,
        None => BatchConfig::default(),
    };
    if !overrides.targets.is_empty() {
        config.targets = overrides.targets;
    }
    if !overrides.patterns.is_empty() {
        config.patterns = overrides
            .patterns
            .iter()
            .map(|raw| parse_pattern(raw))
            .collect::<miette::Result<_>>()?;
    }
    if !overrides.deltas.is_empty() {
        config.deltas = overrides.deltas;
    }
    if let Some(max_tries) = overrides.max_tries {
        config.max_tries = max_tries;
    }
    if let Some(start_line) = overrides.start_line {
        config.start_line = start_line;
    }
    if let Some(workers) = overrides.workers {
        config.workers = workers;
    }
    if overrides.timeout.is_some() {
        config.solver_timeout_secs = overrides.timeout;
    }
    config.validate().into_diagnostic()?;
    Ok(config)
}

pub(crate) fn run_synthesize_command(
    catalog: &Catalog,
    config_path: Option<&Path>,
    overrides: SynthesizeOverrides,
    out: &Path,
    dump_smt: Option<&Path>,
    report_path: Option<&Path>,
) -> miette::Result<()> {
    let config = effective_config(config_path, overrides)?;
    let timeout = config.solver_timeout_secs;

    let report = run_synthesis_batch(catalog, &config, out, dump_smt, move || make_solver(timeout))
        .into_diagnostic()?;

    for file in &report.generated {
        println!(
            "{} {} delta={} attempts={} -> {}",
            file.target,
            file.pattern,
            file.delta,
            file.attempts,
            file.path.display()
        );
    }
    for failure in &report.failures {
        eprintln!(
            "FAILED {} {} delta={}: {}",
            failure.target, failure.pattern, failure.delta, failure.reason
        );
    }
    println!(
        "{} written, {} failed",
        report.generated.len(),
        report.failures.len()
    );

    if let Some(path) = report_path {
        write_json_artifact(path, &report)?;
    }
    if report.generated.is_empty() && !report.failures.is_empty() {
        miette::bail!("No configuration could be synthesized");
    }
    Ok(())
}
