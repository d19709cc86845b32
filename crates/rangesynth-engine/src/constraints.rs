//! Safety constraint model.
//!
//! A target function's invariants are plain data (`Invariant` over `Expr`)
//! so that catalogs can be extended from JSON and so the pattern builder can
//! see which slots must stay positive. `ConstraintModel` lowers them, together
//! with the candidate bounds, to SMT terms and asks a solver for a verdict.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rangesynth_smt::backends::smtlib_printer;
use rangesynth_smt::solver::{SatResult, SmtSolver};
use rangesynth_smt::sorts::SmtSort;
use rangesynth_smt::terms::SmtTerm;

use crate::catalog::TargetFunction;
use crate::error::EngineError;
use crate::model::{Pattern, RangeAssignment, VariableDescriptor};

/// Integer expression over variable positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Var(usize),
    Const(i64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn var(position: usize) -> Self {
        Expr::Var(position)
    }

    pub fn constant(value: i64) -> Self {
        Expr::Const(value)
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(other))
    }

    pub fn div(self, other: Expr) -> Self {
        Expr::Div(Box::new(self), Box::new(other))
    }

    pub fn to_term(&self, name: &impl Fn(usize) -> String) -> SmtTerm {
        match self {
            Expr::Var(i) => SmtTerm::var(name(*i)),
            Expr::Const(c) => SmtTerm::int(*c),
            Expr::Add(l, r) => l.to_term(name).add(r.to_term(name)),
            Expr::Sub(l, r) => l.to_term(name).sub(r.to_term(name)),
            Expr::Mul(l, r) => l.to_term(name).mul(r.to_term(name)),
            Expr::Div(l, r) => l.to_term(name).div(r.to_term(name)),
        }
    }

    fn collect_vars(&self, out: &mut BTreeSet<usize>) {
        match self {
            Expr::Var(i) => {
                out.insert(*i);
            }
            Expr::Const(_) => {}
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
        }
    }

    /// Render with variable expressions substituted, e.g. `(_data.total - _data.pending)`.
    pub fn render(&self, vars: &[VariableDescriptor]) -> String {
        let name = |i: usize| {
            vars.get(i)
                .map(|v| v.expression.clone())
                .unwrap_or_else(|| format!("v{i}"))
        };
        self.render_with(&name)
    }

    fn render_with(&self, name: &impl Fn(usize) -> String) -> String {
        match self {
            Expr::Var(i) => name(*i),
            Expr::Const(c) => c.to_string(),
            Expr::Add(l, r) => format!("({} + {})", l.render_with(name), r.render_with(name)),
            Expr::Sub(l, r) => format!("({} - {})", l.render_with(name), r.render_with(name)),
            Expr::Mul(l, r) => format!("({} * {})", l.render_with(name), r.render_with(name)),
            Expr::Div(l, r) => format!("({} / {})", l.render_with(name), r.render_with(name)),
        }
    }
}

/// One domain safety condition of a target function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Invariant {
    /// `v > 0`: rates, amounts, durations.
    Positive { var: usize },
    /// `v >= 0`.
    NonNegative { var: usize },
    /// `v <= bound`.
    AtMost { var: usize, bound: i64 },
    /// `lesser <= greater` (or `<` when strict), e.g. an old lock period
    /// against its replacement.
    Ordered {
        lesser: usize,
        greater: usize,
        #[serde(default)]
        strict: bool,
    },
    /// `expr >= 0` for an intermediate the function computes by subtraction.
    NonNegativeExpr { label: String, expr: Expr },
    /// `expr >= bound`, typically a quotient by a time unit that must not
    /// truncate to zero.
    AtLeastExpr { label: String, expr: Expr, bound: i64 },
    /// `lhs >= rhs` between two derived quantities.
    ExprGe { label: String, lhs: Expr, rhs: Expr },
}

impl Invariant {
    pub fn to_term(&self, name: &impl Fn(usize) -> String) -> SmtTerm {
        let var = |i: &usize| SmtTerm::var(name(*i));
        match self {
            Invariant::Positive { var: v } => var(v).gt(SmtTerm::int(0)),
            Invariant::NonNegative { var: v } => var(v).ge(SmtTerm::int(0)),
            Invariant::AtMost { var: v, bound } => var(v).le(SmtTerm::int(*bound)),
            Invariant::Ordered {
                lesser,
                greater,
                strict,
            } => {
                if *strict {
                    var(lesser).lt(var(greater))
                } else {
                    var(lesser).le(var(greater))
                }
            }
            Invariant::NonNegativeExpr { expr, .. } => expr.to_term(name).ge(SmtTerm::int(0)),
            Invariant::AtLeastExpr { expr, bound, .. } => {
                expr.to_term(name).ge(SmtTerm::int(*bound))
            }
            Invariant::ExprGe { lhs, rhs, .. } => lhs.to_term(name).ge(rhs.to_term(name)),
        }
    }

    /// Every variable position the invariant mentions.
    pub fn referenced_vars(&self) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        match self {
            Invariant::Positive { var }
            | Invariant::NonNegative { var }
            | Invariant::AtMost { var, .. } => {
                out.insert(*var);
            }
            Invariant::Ordered {
                lesser, greater, ..
            } => {
                out.insert(*lesser);
                out.insert(*greater);
            }
            Invariant::NonNegativeExpr { expr, .. } | Invariant::AtLeastExpr { expr, .. } => {
                expr.collect_vars(&mut out)
            }
            Invariant::ExprGe { lhs, rhs, .. } => {
                lhs.collect_vars(&mut out);
                rhs.collect_vars(&mut out);
            }
        }
        out
    }

    /// Human-readable form using the descriptors' expressions.
    pub fn describe(&self, vars: &[VariableDescriptor]) -> String {
        let name = |i: &usize| {
            vars.get(*i)
                .map(|v| v.expression.clone())
                .unwrap_or_else(|| format!("v{i}"))
        };
        match self {
            Invariant::Positive { var } => format!("{} > 0", name(var)),
            Invariant::NonNegative { var } => format!("{} >= 0", name(var)),
            Invariant::AtMost { var, bound } => format!("{} <= {bound}", name(var)),
            Invariant::Ordered {
                lesser,
                greater,
                strict,
            } => {
                let op = if *strict { "<" } else { "<=" };
                format!("{} {op} {}", name(lesser), name(greater))
            }
            Invariant::NonNegativeExpr { label, expr } => {
                format!("{label}: {} >= 0", expr.render(vars))
            }
            Invariant::AtLeastExpr { label, expr, bound } => {
                format!("{label}: {} >= {bound}", expr.render(vars))
            }
            Invariant::ExprGe { label, lhs, rhs } => {
                format!("{label}: {} >= {}", lhs.render(vars), rhs.render(vars))
            }
        }
    }
}

/// How the candidate box is related to the invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantification {
    /// Some point of the box satisfies every invariant.
    #[default]
    Witness,
    /// Every point of the box satisfies every invariant.
    Universal,
    /// The invariants hold at the all-lower-bounds corner and at the
    /// all-upper-bounds corner simultaneously.
    Corners,
}

impl fmt::Display for Quantification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quantification::Witness => "witness",
            Quantification::Universal => "universal",
            Quantification::Corners => "corners",
        })
    }
}

/// The fixed invariants authored for one target function.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafetyConstraintSet {
    #[serde(default)]
    pub quantification: Quantification,
    pub invariants: Vec<Invariant>,
    /// Extra invariants that only apply under one pattern, e.g. old/new
    /// monotonicity for the scenario a pattern is meant to represent.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pattern_invariants: IndexMap<Pattern, Vec<Invariant>>,
}

impl SafetyConstraintSet {
    pub fn new(invariants: Vec<Invariant>) -> Self {
        Self {
            invariants,
            ..Self::default()
        }
    }

    pub fn with_quantification(mut self, quantification: Quantification) -> Self {
        self.quantification = quantification;
        self
    }

    pub fn with_pattern_invariants(mut self, pattern: Pattern, invariants: Vec<Invariant>) -> Self {
        self.pattern_invariants
            .entry(pattern)
            .or_default()
            .extend(invariants);
        self
    }

    /// Invariants in force under `pattern`: the shared ones first.
    pub fn active(&self, pattern: Pattern) -> impl Iterator<Item = &Invariant> {
        self.invariants.iter().chain(
            self.pattern_invariants
                .get(&pattern)
                .into_iter()
                .flatten(),
        )
    }

    /// Positions that carry a strict-positivity invariant under `pattern`.
    pub fn positive_positions(&self, pattern: Pattern) -> BTreeSet<usize> {
        self.active(pattern)
            .filter_map(|inv| match inv {
                Invariant::Positive { var } => Some(*var),
                _ => None,
            })
            .collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &Invariant> {
        self.invariants
            .iter()
            .chain(self.pattern_invariants.values().flatten())
    }
}

/// Verdict of one feasibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Feasible; `witness` holds one value per variable inside its interval.
    Sat { witness: Vec<i64> },
    Unsat,
    Unknown(String),
}

impl CheckOutcome {
    pub fn is_sat(&self) -> bool {
        matches!(self, CheckOutcome::Sat { .. })
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Sat { .. } => f.write_str("SAT"),
            CheckOutcome::Unsat => f.write_str("UNSAT"),
            CheckOutcome::Unknown(reason) => write!(f, "UNKNOWN ({reason})"),
        }
    }
}

/// Solver-ready form of one candidate.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub declarations: Vec<(String, SmtSort)>,
    pub assertions: Vec<SmtTerm>,
    /// Variables whose model values form the witness, in position order.
    pub witness_vars: Vec<String>,
    /// When true the assertions state the negation of the safety claim, so
    /// solver SAT means the candidate is rejected.
    pub refutation: bool,
}

/// Constraint model of one target function under one pattern.
pub struct ConstraintModel<'a> {
    target: &'a TargetFunction,
    pattern: Pattern,
}

impl<'a> ConstraintModel<'a> {
    pub fn new(target: &'a TargetFunction, pattern: Pattern) -> Self {
        Self { target, pattern }
    }

    fn var_name(position: usize) -> String {
        format!("v{position}")
    }

    fn corner_name(position: usize, corner: &str) -> String {
        format!("v{position}__{corner}")
    }

    /// Lower the candidate bounds and invariants to SMT declarations and
    /// assertions.
    pub fn encode(&self, ranges: &RangeAssignment) -> Result<Encoding, EngineError> {
        let expected = self.target.variables.len();
        if ranges.len() != expected {
            return Err(EngineError::StructuralMismatch {
                target: self.target.id.clone(),
                expected,
                actual: ranges.len(),
            });
        }
        let constraints = &self.target.constraints;
        let invariants: Vec<&Invariant> = constraints.active(self.pattern).collect();

        let encoding = match constraints.quantification {
            Quantification::Witness | Quantification::Universal => {
                let mut declarations = Vec::with_capacity(expected);
                let mut assertions = Vec::with_capacity(expected + invariants.len());
                for (i, interval) in ranges.iter().enumerate() {
                    let name = Self::var_name(i);
                    assertions.push(SmtTerm::var(&name).within(interval.low(), interval.high()));
                    declarations.push((name, SmtSort::Int));
                }
                let terms: Vec<SmtTerm> = invariants
                    .iter()
                    .map(|inv| inv.to_term(&Self::var_name))
                    .collect();
                let refutation = constraints.quantification == Quantification::Universal;
                if refutation {
                    assertions.push(SmtTerm::and(terms).not());
                } else {
                    assertions.extend(terms);
                }
                Encoding {
                    witness_vars: declarations.iter().map(|(n, _)| n.clone()).collect(),
                    declarations,
                    assertions,
                    refutation,
                }
            }
            Quantification::Corners => {
                let mut declarations = Vec::with_capacity(expected * 2);
                let mut assertions = Vec::new();
                for (i, interval) in ranges.iter().enumerate() {
                    let lo = Self::corner_name(i, "lo");
                    let hi = Self::corner_name(i, "hi");
                    assertions.push(SmtTerm::var(&lo).eq(SmtTerm::int(interval.low())));
                    assertions.push(SmtTerm::var(&hi).eq(SmtTerm::int(interval.high())));
                    declarations.push((lo, SmtSort::Int));
                    declarations.push((hi, SmtSort::Int));
                }
                for corner in ["lo", "hi"] {
                    let name = |i: usize| Self::corner_name(i, corner);
                    assertions.extend(invariants.iter().map(|inv| inv.to_term(&name)));
                }
                Encoding {
                    witness_vars: (0..expected).map(|i| Self::corner_name(i, "lo")).collect(),
                    declarations,
                    assertions,
                    refutation: false,
                }
            }
        };
        Ok(encoding)
    }

    /// Decide feasibility of `ranges`. The solver is reset first, so a single
    /// instance can be reused across candidates without stale assertions.
    pub fn check<S: SmtSolver>(
        &self,
        solver: &mut S,
        ranges: &RangeAssignment,
    ) -> Result<CheckOutcome, EngineError> {
        let encoding = self.encode(ranges)?;
        let solver_err = |e: S::Error| EngineError::Solver(e.to_string());

        solver.reset().map_err(solver_err)?;
        for (name, sort) in &encoding.declarations {
            solver.declare_var(name, sort).map_err(solver_err)?;
        }
        for assertion in &encoding.assertions {
            solver.assert(assertion).map_err(solver_err)?;
        }

        if encoding.refutation {
            let outcome = match solver.check_sat().map_err(solver_err)? {
                // No point of the box violates an invariant.
                SatResult::Unsat => CheckOutcome::Sat {
                    witness: ranges.iter().map(|iv| iv.low()).collect(),
                },
                SatResult::Sat => CheckOutcome::Unsat,
                SatResult::Unknown(reason) => CheckOutcome::Unknown(reason),
            };
            debug!(target_fn = %self.target.id, pattern = %self.pattern, %outcome, "universal check");
            return Ok(outcome);
        }

        let query: Vec<(&str, &SmtSort)> = encoding
            .witness_vars
            .iter()
            .map(|name| (name.as_str(), &SmtSort::Int))
            .collect();
        let (verdict, model) = solver.check_sat_with_model(&query).map_err(solver_err)?;
        let outcome = match verdict {
            SatResult::Sat => {
                let witness = match model {
                    Some(model) => encoding
                        .witness_vars
                        .iter()
                        .zip(ranges.iter())
                        .map(|(name, iv)| model.get_int(name).unwrap_or(iv.low()))
                        .collect(),
                    None => ranges.iter().map(|iv| iv.low()).collect(),
                };
                CheckOutcome::Sat { witness }
            }
            SatResult::Unsat => CheckOutcome::Unsat,
            SatResult::Unknown(reason) => CheckOutcome::Unknown(reason),
        };
        debug!(target_fn = %self.target.id, pattern = %self.pattern, %outcome, "feasibility check");
        Ok(outcome)
    }

    /// SMT-LIB2 script equivalent to what `check` hands the solver.
    pub fn to_smtlib(&self, ranges: &RangeAssignment) -> Result<String, EngineError> {
        let encoding = self.encode(ranges)?;
        let mut text = format!(
            "; target: {} ({})\n; pattern: {}\n; quantification: {}{}\n",
            self.target.id,
            self.target.function,
            self.pattern,
            self.target.constraints.quantification,
            if encoding.refutation {
                " (sat means rejected)"
            } else {
                ""
            }
        );
        for inv in self.target.constraints.active(self.pattern) {
            text.push_str(&format!("; {}\n", inv.describe(&self.target.variables)));
        }
        text.push_str(&smtlib_printer::script(
            &encoding.declarations,
            &encoding.assertions,
        ));
        Ok(text)
    }
}
