//! Interval pattern builder.

use crate::catalog::TargetFunction;
use crate::model::{Interval, Pattern, RangeAssignment};

/// Candidate ranges for `target` under `pattern` with spread `delta`.
///
/// One interval per slot rule. A slot whose variable must be strictly
/// positive, whose rule is not pinned, and whose placement starts at or below
/// zero is moved up so that it starts at 1, keeping its width.
pub fn build_ranges(target: &TargetFunction, pattern: Pattern, delta: u32) -> RangeAssignment {
    let positive = target.constraints.positive_positions(pattern);
    target
        .slot_rules(pattern)
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let placed = rule.place(delta);
            if positive.contains(&i) && !rule.is_pinned() && placed.low() <= 0 {
                let width = i64::try_from(placed.width()).unwrap_or(i64::MAX);
                Interval::from_width(1, width)
            } else {
                placed
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, SlotRule};
    use crate::constraints::{Invariant, SafetyConstraintSet};
    use crate::model::{Interval, VarKind, VariableDescriptor};

    fn three_locals(invariants: Vec<Invariant>) -> TargetFunction {
        TargetFunction::new(
            "Triple_c",
            "f",
            (0..3)
                .map(|i| VariableDescriptor::new(format!("x{i}"), VarKind::Local, i))
                .collect(),
            SafetyConstraintSet::new(invariants),
        )
    }

    fn pairs(ranges: &RangeAssignment) -> Vec<(i64, i64)> {
        ranges.iter().map(|iv| (iv.low(), iv.high())).collect()
    }

    #[test]
    fn default_disjoint_bands_do_not_touch() {
        let target = three_locals(vec![]);
        let ranges = build_ranges(&target, Pattern::Disjoint, 3);
        assert_eq!(pairs(&ranges), vec![(0, 3), (4, 7), (8, 11)]);
    }

    #[test]
    fn default_overlap_shares_one_anchor() {
        let target = three_locals(vec![]);
        let ranges = build_ranges(&target, Pattern::Overlap, 6);
        assert_eq!(pairs(&ranges), vec![(100, 106); 3]);
    }

    #[test]
    fn positive_slots_skip_zero_even_with_zero_spread() {
        let target = three_locals(vec![Invariant::Positive { var: 0 }]);
        let ranges = build_ranges(&target, Pattern::Disjoint, 0);
        assert_eq!(pairs(&ranges), vec![(1, 1), (1, 1), (2, 2)]);
    }

    #[test]
    fn pinned_slots_are_not_biased() {
        let target = TargetFunction::new(
            "Pin_c",
            "f",
            vec![VariableDescriptor::new("k", VarKind::State, 0)],
            SafetyConstraintSet::new(vec![Invariant::Positive { var: 0 }]),
        )
        .with_layout(Pattern::Overlap, vec![SlotRule::Pinned { value: 0 }]);
        let ranges = build_ranges(&target, Pattern::Overlap, 5);
        assert_eq!(ranges.get(0), Some(Interval::point(0)));
    }

    #[test]
    fn lock_layouts_follow_their_slot_rules() {
        let catalog = Catalog::builtin();
        let lock = catalog.get("Lock_c").unwrap();
        let overlap = build_ranges(lock, Pattern::Overlap, 3);
        assert_eq!(
            pairs(&overlap),
            vec![
                (200, 203),
                (0, 3),
                (1, 4),
                (1, 2),
                (0, 3),
                (0, 3),
                (15_522_003, 15_522_003),
                (2_592_003, 2_592_003),
            ]
        );
        let disjoint = build_ranges(lock, Pattern::Disjoint, 3);
        assert_eq!(disjoint.get(4), Some(Interval::new(16, 19).unwrap()));
        assert_eq!(disjoint.get(5), Some(Interval::new(12, 15).unwrap()));
    }

    #[test]
    fn reward_multiplier_layout_is_scaled() {
        let catalog = Catalog::builtin();
        let target = catalog.get("GovStakingStorage_c").unwrap();
        let ranges = build_ranges(target, Pattern::Overlap, 1);
        assert_eq!(ranges.get(0), Some(Interval::new(50, 60).unwrap()));
        assert_eq!(ranges.get(7), Some(Interval::point(10_000)));
        let ranges = build_ranges(target, Pattern::Disjoint, 1);
        assert_eq!(ranges.get(0), Some(Interval::new(41, 51).unwrap()));
        assert_eq!(ranges.get(2), Some(Interval::new(20, 30).unwrap()));
    }

    #[test]
    fn positivity_bias_holds_at_the_far_end_of_i64() {
        let catalog = Catalog::from_json_str(
            r#"[{
  "id": "Edge_c",
  "function": "f",
  "variables": [{"expression": "x", "kind": "local", "position": 0}],
  "constraints": {"invariants": [{"kind": "positive", "var": 0}]},
  "layouts": {"overlap": [{"rule": "span", "low": -9223372036854775808, "high": 0}]}
}]"#,
        )
        .unwrap();
        let target = catalog.get("Edge_c").unwrap();
        let ranges = build_ranges(target, Pattern::Overlap, 0);
        assert_eq!(ranges.get(0), Some(Interval::new(1, i64::MAX).unwrap()));
    }
}
