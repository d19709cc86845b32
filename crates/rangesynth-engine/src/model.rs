//! Core value types: variable descriptors, intervals, range assignments and
//! layout patterns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where an annotated variable lives in the target function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Local,
    State,
    Global,
}

impl VarKind {
    pub const ALL: [VarKind; 3] = [VarKind::Local, VarKind::State, VarKind::Global];

    /// Marker emitted in front of the variable in an annotation record.
    pub fn tag(self) -> &'static str {
        match self {
            VarKind::Local => "@LocalVar",
            VarKind::State => "@StateVar",
            VarKind::Global => "@GlobalVar",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        VarKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

/// One annotated variable of a target function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Dotted/indexed name as written in the annotation, e.g. `info.rewardMultiplier`.
    pub expression: String,
    pub kind: VarKind,
    /// Slot in the ordered variable list and in every parallel range list.
    pub position: usize,
}

impl VariableDescriptor {
    pub fn new(expression: impl Into<String>, kind: VarKind, position: usize) -> Self {
        Self {
            expression: expression.into(),
            kind,
            position,
        }
    }
}

/// Closed integer interval with `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    low: i64,
    high: i64,
}

#[derive(Deserialize)]
struct RawInterval {
    low: i64,
    high: i64,
}

impl TryFrom<RawInterval> for Interval {
    type Error = String;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(raw.low, raw.high)
            .ok_or_else(|| format!("interval [{},{}] has low > high", raw.low, raw.high))
    }
}

impl Interval {
    /// `None` when `low > high`.
    pub fn new(low: i64, high: i64) -> Option<Self> {
        (low <= high).then_some(Self { low, high })
    }

    pub fn point(value: i64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    /// `[low, low + width]`; a negative width collapses to a point.
    pub fn from_width(low: i64, width: i64) -> Self {
        Self {
            low,
            high: low.saturating_add(width.max(0)),
        }
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    pub fn width(&self) -> u64 {
        self.high.abs_diff(self.low)
    }

    /// Both bounds moved by `by`.
    pub fn shifted(self, by: i64) -> Self {
        Self {
            low: self.low.saturating_add(by),
            high: self.high.saturating_add(by),
        }
    }

    /// Lower bound moved down by `by`, never below `floor` and never above
    /// the current lower bound.
    pub fn lowered_toward(self, by: i64, floor: i64) -> Self {
        let target = self.low.saturating_sub(by.max(0)).max(floor);
        Self {
            low: target.min(self.low),
            high: self.high,
        }
    }

    /// Both bounds pushed outward by `by` (negative values are ignored).
    pub fn widened(self, by: i64) -> Self {
        let by = by.max(0);
        Self {
            low: self.low.saturating_sub(by),
            high: self.high.saturating_add(by),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.low <= value && value <= self.high
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.low, self.high)
    }
}

/// Interval as reported back by an analysis: either bounded, or open above
/// when the analysis could not resolve an upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedInterval {
    Bounded(Interval),
    UnboundedAbove { low: i64 },
}

impl ObservedInterval {
    pub fn bounded(&self) -> Option<Interval> {
        match self {
            ObservedInterval::Bounded(interval) => Some(*interval),
            ObservedInterval::UnboundedAbove { .. } => None,
        }
    }
}

impl fmt::Display for ObservedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservedInterval::Bounded(interval) => interval.fmt(f),
            ObservedInterval::UnboundedAbove { low } => write!(f, "[{low},inf]"),
        }
    }
}

/// One interval per variable descriptor, indexed by `position`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeAssignment(Vec<Interval>);

impl RangeAssignment {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self(intervals)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.0
    }

    pub fn get(&self, position: usize) -> Option<Interval> {
        self.0.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.0.iter()
    }

    /// Replace slot `position` with `f(old)`; out-of-range positions are a no-op.
    pub fn map_slot(mut self, position: usize, f: impl FnOnce(Interval) -> Interval) -> Self {
        if let Some(slot) = self.0.get_mut(position) {
            *slot = f(*slot);
        }
        self
    }

    pub fn into_inner(self) -> Vec<Interval> {
        self.0
    }
}

impl FromIterator<Interval> for RangeAssignment {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RangeAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Interval::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Layout rule family used to place candidate intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Pattern {
    /// Intervals anchored at shared or closely related bases; heavy overlap.
    Overlap,
    /// Each variable in its own numeric band; no two ranges overlap.
    Disjoint,
}

impl Pattern {
    pub const ALL: [Pattern; 2] = [Pattern::Overlap, Pattern::Disjoint];

    pub fn as_str(self) -> &'static str {
        match self {
            Pattern::Overlap => "overlap",
            Pattern::Disjoint => "disjoint",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Pattern {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overlap" | "uniform" | "safe" | "same" => Ok(Pattern::Overlap),
            "disjoint" | "diff" => Ok(Pattern::Disjoint),
            other => Err(format!(
                "unknown pattern '{other}' (expected overlap | disjoint)"
            )),
        }
    }
}
