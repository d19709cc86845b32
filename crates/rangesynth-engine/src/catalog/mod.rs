//! Target-function catalog.
//!
//! Every function the tool can synthesize ranges for is a `TargetFunction`
//! entry: ordered variable descriptors, its safety constraints, and optional
//! per-pattern slot layouts and relaxation schedules. Adding a function is a
//! data addition, either in [`builtin`] or in a JSON catalog file.

mod builtin;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constraints::{Expr, Invariant, SafetyConstraintSet};
use crate::error::EngineError;
use crate::model::{Interval, Pattern, VariableDescriptor};
use crate::widening::Relaxation;

/// Band gap of the default disjoint layout: band `i` starts at `i * (Δ + 1)`.
pub const DEFAULT_BAND_GAP: i64 = 1;
/// Shared anchor of the default overlap layout.
pub const DEFAULT_OVERLAP_BASE: i64 = 100;
/// Per-side growth of the default relaxation.
pub const DEFAULT_WIDEN_STEP: i64 = 10;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown target function `{0}`")]
    UnknownTarget(String),
    #[error("Invalid catalog entry `{id}`: {reason}")]
    Invalid { id: String, reason: String },
    #[error("Catalog parse error: {0}")]
    Parse(String),
}

fn one() -> i64 {
    1
}

/// Placement of one variable's candidate interval for a spread `Δ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SlotRule {
    /// `(base * scale, (base + Δ) * scale)`.
    Anchored {
        base: i64,
        #[serde(default = "one")]
        scale: i64,
    },
    /// Band `index` of a disjoint layout:
    /// `b = index * (Δ + gap) * scale + offset`, interval `(b, b + Δ * scale)`.
    Band {
        index: i64,
        #[serde(default = "one")]
        gap: i64,
        #[serde(default = "one")]
        scale: i64,
        #[serde(default)]
        offset: i64,
    },
    /// Fixed `(low, high)` independent of `Δ`.
    Span { low: i64, high: i64 },
    /// Constant `(value, value)`; never relaxed.
    Pinned { value: i64 },
    /// Constant `(value + Δ, value + Δ)`; never relaxed.
    PinnedPlusDelta { value: i64 },
}

impl SlotRule {
    pub fn place(&self, delta: u32) -> Interval {
        let d = i64::from(delta);
        match *self {
            SlotRule::Anchored { base, scale } => {
                let low = base.saturating_mul(scale);
                Interval::from_width(low, d.saturating_mul(scale))
            }
            SlotRule::Band {
                index,
                gap,
                scale,
                offset,
            } => {
                let low = index
                    .saturating_mul(d.saturating_add(gap))
                    .saturating_mul(scale)
                    .saturating_add(offset);
                Interval::from_width(low, d.saturating_mul(scale))
            }
            SlotRule::Span { low, high } => Interval::from_width(low, high.saturating_sub(low)),
            SlotRule::Pinned { value } => Interval::point(value),
            SlotRule::PinnedPlusDelta { value } => Interval::point(value.saturating_add(d)),
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, SlotRule::Pinned { .. } | SlotRule::PinnedPlusDelta { .. })
    }

    fn problem(&self) -> Option<String> {
        match *self {
            SlotRule::Anchored { scale, .. } if scale < 1 => {
                Some(format!("anchored scale must be >= 1, got {scale}"))
            }
            SlotRule::Band { index, .. } if index < 0 => {
                Some(format!("band index must be >= 0, got {index}"))
            }
            SlotRule::Band { gap, .. } if gap < 0 => Some(format!("band gap must be >= 0, got {gap}")),
            SlotRule::Band { scale, .. } if scale < 1 => {
                Some(format!("band scale must be >= 1, got {scale}"))
            }
            SlotRule::Span { low, high } if low > high => {
                Some(format!("span [{low},{high}] has low > high"))
            }
            _ => None,
        }
    }
}

/// One function the synthesizer can target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFunction {
    /// Contract identifier, e.g. `Lock_c`. Also the catalog key and the
    /// prefix of every output file.
    pub id: String,
    pub function: String,
    pub variables: Vec<VariableDescriptor>,
    pub constraints: SafetyConstraintSet,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub layouts: IndexMap<Pattern, Vec<SlotRule>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relaxations: IndexMap<Pattern, Vec<Relaxation>>,
}

impl TargetFunction {
    pub fn new(
        id: impl Into<String>,
        function: impl Into<String>,
        variables: Vec<VariableDescriptor>,
        constraints: SafetyConstraintSet,
    ) -> Self {
        Self {
            id: id.into(),
            function: function.into(),
            variables,
            constraints,
            layouts: IndexMap::new(),
            relaxations: IndexMap::new(),
        }
    }

    pub fn with_layout(mut self, pattern: Pattern, rules: Vec<SlotRule>) -> Self {
        self.layouts.insert(pattern, rules);
        self
    }

    pub fn with_relaxation(mut self, pattern: Pattern, steps: Vec<Relaxation>) -> Self {
        self.relaxations.insert(pattern, steps);
        self
    }

    /// Slot rules for `pattern`, falling back to the default layout.
    pub fn slot_rules(&self, pattern: Pattern) -> Vec<SlotRule> {
        if let Some(rules) = self.layouts.get(&pattern) {
            return rules.clone();
        }
        (0..self.variables.len())
            .map(|i| match pattern {
                Pattern::Overlap => SlotRule::Anchored {
                    base: DEFAULT_OVERLAP_BASE,
                    scale: 1,
                },
                Pattern::Disjoint => SlotRule::Band {
                    index: i as i64,
                    gap: DEFAULT_BAND_GAP,
                    scale: 1,
                    offset: 0,
                },
            })
            .collect()
    }

    /// Relaxation applied after each rejected candidate under `pattern`.
    pub fn relaxation(&self, pattern: Pattern) -> Vec<Relaxation> {
        self.relaxations
            .get(&pattern)
            .cloned()
            .unwrap_or_else(|| {
                vec![Relaxation::Widen {
                    by: DEFAULT_WIDEN_STEP,
                }]
            })
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::Invalid {
            id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty id".into()));
        }
        if self.variables.is_empty() {
            return Err(invalid("no variables".into()));
        }
        for (i, var) in self.variables.iter().enumerate() {
            if var.position != i {
                return Err(invalid(format!(
                    "variable `{}` declares position {} but is listed at {i}",
                    var.expression, var.position
                )));
            }
            if var.expression.trim().is_empty() {
                return Err(invalid(format!("variable {i} has an empty expression")));
            }
        }
        let count = self.variables.len();
        for inv in self.constraints.all() {
            if let Some(bad) = inv.referenced_vars().into_iter().find(|&v| v >= count) {
                return Err(invalid(format!(
                    "invariant `{}` references variable {bad} of {count}",
                    inv.describe(&self.variables)
                )));
            }
            if divides_by_zero(inv) {
                return Err(invalid(format!(
                    "invariant `{}` divides by the constant 0",
                    inv.describe(&self.variables)
                )));
            }
        }
        for (pattern, rules) in &self.layouts {
            if rules.len() != count {
                return Err(invalid(format!(
                    "{pattern} layout has {} slots for {count} variables",
                    rules.len()
                )));
            }
            if let Some(problem) = rules.iter().find_map(SlotRule::problem) {
                return Err(invalid(format!("{pattern} layout: {problem}")));
            }
        }
        for (pattern, steps) in &self.relaxations {
            if let Some(bad) = steps
                .iter()
                .filter_map(Relaxation::target_var)
                .find(|&v| v >= count)
            {
                return Err(invalid(format!(
                    "{pattern} relaxation references variable {bad} of {count}"
                )));
            }
        }
        Ok(())
    }
}

fn divides_by_zero(inv: &Invariant) -> bool {
    fn walk(expr: &Expr) -> bool {
        match expr {
            Expr::Var(_) | Expr::Const(_) => false,
            Expr::Div(_, r) if **r == Expr::Const(0) => true,
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                walk(l) || walk(r)
            }
        }
    }
    match inv {
        Invariant::NonNegativeExpr { expr, .. } | Invariant::AtLeastExpr { expr, .. } => walk(expr),
        Invariant::ExprGe { lhs, rhs, .. } => walk(lhs) || walk(rhs),
        _ => false,
    }
}

/// Keyed collection of target functions, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    targets: IndexMap<String, TargetFunction>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The studied functions shipped with the tool.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for target in builtin::targets() {
            catalog.targets.insert(target.id.clone(), target);
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Result<&TargetFunction, CatalogError> {
        self.targets
            .get(id)
            .ok_or_else(|| CatalogError::UnknownTarget(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.targets.contains_key(id)
    }

    /// Validate and insert, returning the entry it replaced.
    pub fn insert(&mut self, target: TargetFunction) -> Result<Option<TargetFunction>, CatalogError> {
        target.validate()?;
        Ok(self.targets.insert(target.id.clone(), target))
    }

    /// Parse a JSON array of target functions.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let entries: Vec<TargetFunction> =
            serde_json::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let mut catalog = Self::new();
        for target in entries {
            if catalog.contains(&target.id) {
                return Err(CatalogError::Invalid {
                    id: target.id,
                    reason: "duplicate id".into(),
                });
            }
            catalog.insert(target)?;
        }
        Ok(catalog)
    }

    pub fn read(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Overlay `other`; its entries replace same-id entries.
    pub fn merge(&mut self, other: Catalog) {
        for (id, target) in other.targets {
            self.targets.insert(id, target);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetFunction> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
