//! Bounded widening search.
//!
//! `relax` is a pure transition over range assignments; `synthesize` drives it
//! with an explicit attempt counter and stops at the first feasible candidate.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use rangesynth_smt::solver::SmtSolver;

use crate::catalog::TargetFunction;
use crate::constraints::{CheckOutcome, ConstraintModel};
use crate::error::EngineError;
use crate::model::{Pattern, RangeAssignment};
use crate::pattern::build_ranges;

/// Default bound on feasibility checks per configuration.
pub const DEFAULT_MAX_TRIES: u32 = 40;

/// One relaxation step applied after a rejected candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Relaxation {
    /// Move both bounds of slot `var` by `by`.
    Shift { var: usize, by: i64 },
    /// Move the lower bound of slot `var` down by `by`, not below `floor`.
    LowerFloor { var: usize, by: i64, floor: i64 },
    /// Push every slot outward by `by` on both sides.
    Widen { by: i64 },
}

impl Relaxation {
    pub fn target_var(&self) -> Option<usize> {
        match self {
            Relaxation::Shift { var, .. } | Relaxation::LowerFloor { var, .. } => Some(*var),
            Relaxation::Widen { .. } => None,
        }
    }
}

/// Apply `steps` in order. Pinned slots of `pattern` are left untouched.
pub fn relax(
    target: &TargetFunction,
    pattern: Pattern,
    ranges: RangeAssignment,
    steps: &[Relaxation],
) -> RangeAssignment {
    let pinned: Vec<bool> = target
        .slot_rules(pattern)
        .iter()
        .map(|rule| rule.is_pinned())
        .collect();
    let is_pinned = |i: usize| pinned.get(i).copied().unwrap_or(false);

    steps.iter().fold(ranges, |ranges, step| match *step {
        Relaxation::Shift { var, by } if !is_pinned(var) => {
            ranges.map_slot(var, |iv| iv.shifted(by))
        }
        Relaxation::LowerFloor { var, by, floor } if !is_pinned(var) => {
            ranges.map_slot(var, |iv| iv.lowered_toward(by, floor))
        }
        Relaxation::Widen { by } => ranges
            .into_inner()
            .into_iter()
            .enumerate()
            .map(|(i, iv)| if is_pinned(i) { iv } else { iv.widened(by) })
            .collect(),
        _ => ranges,
    })
}

/// Accepted ranges for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub ranges: RangeAssignment,
    /// Number of checks made, including the accepting one.
    pub attempts: u32,
    /// One satisfying value per variable.
    pub witness: Vec<i64>,
}

/// One step of the search, reported to observers.
#[derive(Debug)]
pub struct Attempt<'a> {
    pub number: u32,
    pub ranges: &'a RangeAssignment,
    pub outcome: &'a CheckOutcome,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(
        "No satisfiable ranges for `{target}::{function}` ({pattern}, delta {delta}) after {attempts} attempts"
    )]
    Unsatisfiable {
        target: String,
        function: String,
        pattern: Pattern,
        delta: u32,
        attempts: u32,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SynthesisError {
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, SynthesisError::Unsatisfiable { .. })
    }
}

pub fn synthesize<S: SmtSolver>(
    solver: &mut S,
    target: &TargetFunction,
    pattern: Pattern,
    delta: u32,
    max_tries: u32,
) -> Result<Synthesis, SynthesisError> {
    synthesize_observed(solver, target, pattern, delta, max_tries, |_| {})
}

/// `synthesize`, calling `observe` after every check.
pub fn synthesize_observed<S, F>(
    solver: &mut S,
    target: &TargetFunction,
    pattern: Pattern,
    delta: u32,
    max_tries: u32,
    mut observe: F,
) -> Result<Synthesis, SynthesisError>
where
    S: SmtSolver,
    F: FnMut(&Attempt<'_>),
{
    let model = ConstraintModel::new(target, pattern);
    let steps = target.relaxation(pattern);
    let mut ranges = build_ranges(target, pattern, delta);

    for number in 1..=max_tries {
        let outcome = model.check(solver, &ranges)?;
        observe(&Attempt {
            number,
            ranges: &ranges,
            outcome: &outcome,
        });
        match outcome {
            CheckOutcome::Sat { witness } => {
                debug!(target_fn = %target.id, %pattern, delta, attempts = number, "accepted");
                return Ok(Synthesis {
                    ranges,
                    attempts: number,
                    witness,
                });
            }
            CheckOutcome::Unknown(reason) => {
                warn!(
                    target_fn = %target.id,
                    %pattern,
                    delta,
                    attempt = number,
                    solver = solver.name(),
                    "solver returned unknown ({reason}); treating as rejected"
                );
            }
            CheckOutcome::Unsat => {}
        }
        ranges = relax(target, pattern, ranges, &steps);
    }

    Err(SynthesisError::Unsatisfiable {
        target: target.id.clone(),
        function: target.function.clone(),
        pattern,
        delta,
        attempts: max_tries,
    })
}
