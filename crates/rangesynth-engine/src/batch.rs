//! Batch drivers.
//!
//! Per-configuration failures (unsatisfiable searches, solver errors, unparsable
//! mutant names, missing offsets) are logged and recorded in the report. Only
//! contract violations stop a batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use rangesynth_smt::solver::SmtSolver;

use crate::annotation::{self, AnnotationDocument};
use crate::catalog::Catalog;
use crate::config::{BatchConfig, Job};
use crate::constraints::ConstraintModel;
use crate::error::EngineError;
use crate::model::{Pattern, RangeAssignment};
use crate::propagate::{self, MutantId, OffsetTable};
use crate::widening::{synthesize, SynthesisError};

/// Suffix of a base contract's canonical annotation file.
pub const BASE_ANNOTATION_SUFFIX: &str = "_annot.json";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub target: String,
    pub pattern: Pattern,
    pub delta: u32,
    pub attempts: u32,
    pub path: PathBuf,
    pub ranges: RangeAssignment,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedConfiguration {
    pub target: String,
    pub pattern: Pattern,
    pub delta: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SynthesisReport {
    pub generated: Vec<GeneratedFile>,
    pub failures: Vec<FailedConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PropagationReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedItem>,
}

enum JobOutcome {
    Generated(GeneratedFile),
    Failed(FailedConfiguration),
    Aborted(EngineError),
}

struct JobContext {
    catalog: Catalog,
    config: BatchConfig,
    out_dir: PathBuf,
    dump_smt: Option<PathBuf>,
}

fn create_dir(path: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(path).map_err(|e| EngineError::io(path, e))
}

/// Synthesize every configuration of `config` and write one annotation file
/// per accepted configuration into `out_dir`.
///
/// Each worker thread builds its own solver with `make_solver`.
pub fn run_synthesis_batch<S, F>(
    catalog: &Catalog,
    config: &BatchConfig,
    out_dir: &Path,
    dump_smt: Option<&Path>,
    make_solver: F,
) -> Result<SynthesisReport, EngineError>
where
    S: SmtSolver + 'static,
    F: Fn() -> S + Send + Sync + 'static,
{
    let jobs = Arc::new(config.jobs(catalog)?);
    create_dir(out_dir)?;
    if let Some(dir) = dump_smt {
        create_dir(dir)?;
    }
    info!(
        configurations = jobs.len(),
        workers = config.workers,
        out = %out_dir.display(),
        "starting synthesis batch"
    );

    let ctx = Arc::new(JobContext {
        catalog: catalog.clone(),
        config: config.clone(),
        out_dir: out_dir.to_path_buf(),
        dump_smt: dump_smt.map(Path::to_path_buf),
    });
    let make_solver = Arc::new(make_solver);
    let next = Arc::new(AtomicUsize::new(0));
    let abort = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let workers = config.workers.clamp(1, jobs.len().max(1));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let (jobs, ctx, make_solver) = (Arc::clone(&jobs), Arc::clone(&ctx), Arc::clone(&make_solver));
            let (next, abort, tx) = (Arc::clone(&next), Arc::clone(&abort), tx.clone());
            thread::spawn(move || {
                let mut solver = make_solver();
                loop {
                    if abort.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(job) = jobs.get(index) else {
                        break;
                    };
                    let outcome = run_job(&mut solver, &ctx, job);
                    if matches!(outcome, JobOutcome::Aborted(_)) {
                        abort.store(true, Ordering::SeqCst);
                    }
                    if tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(tx);

    let mut outcomes: Vec<Option<JobOutcome>> = (0..jobs.len()).map(|_| None).collect();
    for (index, outcome) in rx {
        if let Some(slot) = outcomes.get_mut(index) {
            *slot = Some(outcome);
        }
    }
    let mut panicked = false;
    for handle in handles {
        panicked |= handle.join().is_err();
    }
    if panicked {
        return Err(EngineError::Solver("synthesis worker panicked".into()));
    }

    let mut report = SynthesisReport::default();
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            JobOutcome::Generated(file) => report.generated.push(file),
            JobOutcome::Failed(failure) => report.failures.push(failure),
            JobOutcome::Aborted(err) => return Err(err),
        }
    }
    info!(
        generated = report.generated.len(),
        failed = report.failures.len(),
        "synthesis batch finished"
    );
    Ok(report)
}

fn run_job<S: SmtSolver>(solver: &mut S, ctx: &JobContext, job: &Job) -> JobOutcome {
    let failed = |reason: String| {
        warn!(target_fn = %job.target, pattern = %job.pattern, delta = job.delta, "{reason}");
        JobOutcome::Failed(FailedConfiguration {
            target: job.target.clone(),
            pattern: job.pattern,
            delta: job.delta,
            reason,
        })
    };
    let target = match ctx.catalog.get(&job.target) {
        Ok(target) => target,
        Err(e) => return failed(e.to_string()),
    };

    let found = match synthesize(solver, target, job.pattern, job.delta, ctx.config.max_tries) {
        Ok(found) => found,
        Err(SynthesisError::Engine(e)) if e.is_contract_violation() => {
            return JobOutcome::Aborted(e)
        }
        Err(e) => return failed(e.to_string()),
    };

    let doc = match annotation::serialize(target, &found.ranges, ctx.config.start_line) {
        Ok(doc) => doc,
        Err(e) => return JobOutcome::Aborted(e),
    };
    let name = propagate::synthesized_file_name(&target.id, job.pattern, job.delta);
    let path = ctx.out_dir.join(&name);
    if let Err(e) = doc.write_atomic(&path) {
        return failed(e.to_string());
    }
    if let Some(dir) = &ctx.dump_smt {
        let smt_path = dir.join(name.replace(".json", ".smt2"));
        let written = ConstraintModel::new(target, job.pattern)
            .to_smtlib(&found.ranges)
            .and_then(|text| annotation::write_atomic(&smt_path, text.as_bytes()));
        if let Err(e) = written {
            warn!(path = %smt_path.display(), "could not dump SMT model: {e}");
        }
    }
    info!(
        target_fn = %target.id,
        pattern = %job.pattern,
        delta = job.delta,
        attempts = found.attempts,
        "accepted {}",
        found.ranges
    );
    JobOutcome::Generated(GeneratedFile {
        target: target.id.clone(),
        pattern: job.pattern,
        delta: job.delta,
        attempts: found.attempts,
        path,
        ranges: found.ranges,
    })
}

/// Stems of the `.sol` files in `dir`, sorted.
pub fn list_mutants(dir: &Path) -> Result<Vec<String>, EngineError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| EngineError::io(dir, e))? {
        let path = entry.map_err(|e| EngineError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "sol") {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn json_file_names(dir: &Path) -> Result<Vec<String>, EngineError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| EngineError::io(dir, e))? {
        let entry = entry.map_err(|e| EngineError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Read `{contract}_annot.json` for each contract (every such file in
/// `annotation_dir` when `contracts` is empty) and record where its BEGIN
/// record sits.
pub fn discover_offsets(
    annotation_dir: &Path,
    contracts: &[String],
) -> Result<(OffsetTable, Vec<SkippedItem>), EngineError> {
    let contracts: Vec<String> = if contracts.is_empty() {
        json_file_names(annotation_dir)?
            .into_iter()
            .filter_map(|name| name.strip_suffix(BASE_ANNOTATION_SUFFIX).map(str::to_string))
            .collect()
    } else {
        contracts.to_vec()
    };

    let mut table = OffsetTable::new();
    let mut skipped = Vec::new();
    for contract in contracts {
        let path = annotation_dir.join(format!("{contract}{BASE_ANNOTATION_SUFFIX}"));
        let skip = |reason: String| {
            warn!(contract = %contract, "{reason}");
            SkippedItem {
                item: contract.clone(),
                reason,
            }
        };
        if !path.is_file() {
            skipped.push(skip(format!("{} not found", path.display())));
            continue;
        }
        let doc = match AnnotationDocument::read(&path) {
            Ok(doc) => doc,
            Err(e) => {
                skipped.push(skip(e.to_string()));
                continue;
            }
        };
        match doc.begin_line() {
            Some(line) => {
                debug!(contract = %contract, line, "base annotation anchor");
                table.insert(contract.clone(), line);
            }
            None => skipped.push(skip(format!("{} has no BEGIN record", path.display()))),
        }
    }
    Ok((table, skipped))
}

/// Copy every synthesized configuration of each mutant's base contract onto
/// the mutant, re-anchored by the base's offset.
///
/// `configs_dir` holds `{base}_{pattern}_{delta}.json` files. Bases named in
/// `catalog` or `offsets` resolve identifiers with several `_c_` markers.
pub fn run_propagation_batch(
    mutants: &[String],
    configs_dir: &Path,
    offsets: &OffsetTable,
    catalog: &Catalog,
    out_dir: &Path,
) -> Result<PropagationReport, EngineError> {
    let configs = json_file_names(configs_dir)?;
    create_dir(out_dir)?;
    let mut report = PropagationReport::default();

    fn skip(report: &mut PropagationReport, item: String, reason: String) {
        warn!(item = %item, "skipped: {reason}");
        report.skipped.push(SkippedItem { item, reason });
    }

    for name in mutants {
        let mutant = match MutantId::parse_with_known(name, |base| {
            catalog.contains(base) || offsets.contains(base)
        }) {
            Ok(mutant) => mutant,
            Err(e) => {
                skip(&mut report, name.clone(), e.to_string());
                continue;
            }
        };
        if let Err(e) = offsets.offset_for(&mutant.base) {
            skip(&mut report, name.clone(), e.to_string());
            continue;
        }

        let prefix = format!("{}_", mutant.base);
        let matching: Vec<(&String, &str)> = configs
            .iter()
            .filter_map(|file| {
                let suffix = file.strip_prefix(&prefix)?;
                propagate::parse_config_suffix(suffix).map(|_| (file, suffix))
            })
            .collect();
        if matching.is_empty() {
            skip(
                &mut report,
                name.clone(),
                format!("no synthesized configurations for `{}`", mutant.base),
            );
            continue;
        }

        for (file, suffix) in matching {
            let written = AnnotationDocument::read(&configs_dir.join(file)).and_then(|doc| {
                let moved = propagate::propagate(&doc, &mutant, offsets)?;
                let path = out_dir.join(propagate::propagated_file_name(&mutant, suffix));
                moved.write_atomic(&path)?;
                Ok(path)
            });
            match written {
                Ok(path) => {
                    debug!(path = %path.display(), "propagated");
                    report.written.push(path);
                }
                Err(e) => skip(&mut report, format!("{name} <- {file}"), e.to_string()),
            }
        }
    }
    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        "propagation batch finished"
    );
    Ok(report)
}
