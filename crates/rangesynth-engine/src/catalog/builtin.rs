//! The studied target functions.

use crate::catalog::{SlotRule, TargetFunction};
use crate::constraints::{Expr, Invariant, SafetyConstraintSet};
use crate::model::{Pattern, VarKind, VariableDescriptor};
use crate::widening::Relaxation;

/// Seconds per week, the divisor of every lock-period quotient.
const WEEK: i64 = 604_800;
/// Fixed-point divisor of the reward multiplier arithmetic.
const REWARD_DIV: i64 = 100_000;
/// Scale of the reward-multiplier layouts.
const REWARD_SCALE: i64 = 10;
/// Gap between bands of the focused disjoint layouts.
const FOCUSED_GAP: i64 = 20;
const LOCKED_TIME: i64 = 15_522_000;
const UNLOCK_DURATION: i64 = 2_592_000;

pub(super) fn targets() -> Vec<TargetFunction> {
    vec![
        reward_multiplier(),
        green_house(),
        hub_pool(),
        lock_pending(),
        lockup_contract(),
        pool_keeper(),
        thorus_bond(),
    ]
}

fn vars(list: &[(&str, VarKind)]) -> Vec<VariableDescriptor> {
    list.iter()
        .enumerate()
        .map(|(i, (expr, kind))| VariableDescriptor::new(*expr, *kind, i))
        .collect()
}

/// Shared-anchor overlap at 100 and widely spaced disjoint bands.
fn focused(
    id: &str,
    function: &str,
    variables: Vec<VariableDescriptor>,
    invariants: Vec<Invariant>,
) -> TargetFunction {
    let count = variables.len() as i64;
    TargetFunction::new(id, function, variables, SafetyConstraintSet::new(invariants))
        .with_layout(
            Pattern::Disjoint,
            (0..count)
                .map(|index| SlotRule::Band {
                    index,
                    gap: FOCUSED_GAP,
                    scale: 1,
                    offset: 0,
                })
                .collect(),
        )
}

fn pos(var: usize) -> Invariant {
    Invariant::Positive { var }
}

fn non_neg(var: usize) -> Invariant {
    Invariant::NonNegative { var }
}

fn ordered(lesser: usize, greater: usize) -> Invariant {
    Invariant::Ordered {
        lesser,
        greater,
        strict: false,
    }
}

fn v(i: usize) -> Expr {
    Expr::var(i)
}

fn c(value: i64) -> Expr {
    Expr::constant(value)
}

fn reward_multiplier() -> TargetFunction {
    use VarKind::{Local, State};
    let variables = vars(&[
        ("oldRate", Local),
        ("newRate", Local),
        ("passedTime", Local),
        ("oldLockPeriod", Local),
        ("newLockPeriod", Local),
        ("oldAmount", Local),
        ("newAmount", Local),
        ("info.rewardMultiplier", State),
        ("totalRewardMultiplier", State),
    ]);
    let remaining_weeks = v(3).sub(v(2)).div(c(WEEK));
    let new_weeks = v(4).div(c(WEEK));
    let to_remove = remaining_weeks
        .clone()
        .mul(v(0))
        .mul(v(5))
        .div(c(REWARD_DIV));
    let to_add = new_weeks.clone().mul(v(1)).mul(v(6)).div(c(REWARD_DIV));

    let constraints = SafetyConstraintSet::new(vec![
        pos(0),
        pos(1),
        pos(5),
        pos(6),
        ordered(2, 3),
        Invariant::AtLeastExpr {
            label: "remainingWeeks".into(),
            expr: remaining_weeks,
            bound: 1,
        },
        Invariant::AtLeastExpr {
            label: "newWeeks".into(),
            expr: new_weeks,
            bound: 1,
        },
        Invariant::ExprGe {
            label: "toAdd >= toRemove".into(),
            lhs: to_add,
            rhs: to_remove,
        },
    ])
    .with_pattern_invariants(Pattern::Overlap, vec![ordered(0, 1), ordered(3, 4), ordered(5, 6)]);

    let same = |base: i64| SlotRule::Anchored {
        base,
        scale: REWARD_SCALE,
    };
    let band = |index: i64, offset: i64| SlotRule::Band {
        index,
        gap: 1,
        scale: REWARD_SCALE,
        offset,
    };
    let steps = vec![
        Relaxation::Shift { var: 1, by: 2 },
        Relaxation::Shift { var: 6, by: 2 },
        Relaxation::LowerFloor {
            var: 5,
            by: 1,
            floor: 1,
        },
        Relaxation::Shift { var: 4, by: WEEK },
    ];

    TargetFunction::new(
        "GovStakingStorage_c",
        "updateRewardMultiplier",
        variables,
        constraints,
    )
    .with_layout(
        Pattern::Overlap,
        vec![
            same(5),
            same(8),
            same(1),
            same(8 * WEEK),
            same(12 * WEEK),
            same(10),
            same(20),
            SlotRule::Pinned { value: 10_000 },
            SlotRule::Pinned { value: 50_000 },
        ],
    )
    .with_layout(
        Pattern::Disjoint,
        vec![
            band(2, 1),
            band(6, 1),
            band(1, 0),
            SlotRule::Anchored {
                base: 12 * WEEK,
                scale: 1,
            },
            SlotRule::Anchored {
                base: 20 * WEEK,
                scale: 1,
            },
            band(5, 1),
            band(10, 1),
            SlotRule::Pinned { value: 10_000 },
            SlotRule::Pinned { value: 50_000 },
        ],
    )
    .with_relaxation(Pattern::Overlap, steps.clone())
    .with_relaxation(Pattern::Disjoint, steps)
}

fn green_house() -> TargetFunction {
    focused(
        "GreenHouse_c",
        "_calculateFees",
        vars(&[("amount", VarKind::Local)]),
        vec![
            pos(0),
            Invariant::AtMost {
                var: 0,
                bound: 999_999,
            },
        ],
    )
}

fn hub_pool() -> TargetFunction {
    use VarKind::{Local, State};
    let mut invariants: Vec<Invariant> = (0..6).map(non_neg).collect();
    invariants.extend([
        Invariant::AtMost { var: 0, bound: 100 },
        pos(5),
        Invariant::NonNegativeExpr {
            label: "lpFeesCaptured".into(),
            expr: v(5).sub(v(5).mul(v(0)).div(c(1_000_000_000_000_000_000))),
        },
    ]);
    focused(
        "HubPool_c",
        "_allocateLpAndProtocolFees",
        vars(&[
            ("protocolFeeCapturePct", State),
            ("pooledTokens[l1Token].undistributedLpFees", State),
            ("pooledTokens[l1Token].utilizedReserves", State),
            ("unclaimedAccumulatedProtocolFees[l1Token]", State),
            ("l1Token", Local),
            ("bundleLpFees", Local),
        ]),
        invariants,
    )
}

fn lock_pending() -> TargetFunction {
    use VarKind::{Global, State};
    let zero_based = SlotRule::Anchored { base: 0, scale: 1 };
    let band = |index: i64| SlotRule::Band {
        index,
        gap: 1,
        scale: 1,
        offset: 0,
    };
    let constants = [
        SlotRule::PinnedPlusDelta { value: LOCKED_TIME },
        SlotRule::PinnedPlusDelta {
            value: UNLOCK_DURATION,
        },
    ];
    let overlap = [
        SlotRule::Anchored { base: 200, scale: 1 },
        zero_based,
        zero_based,
        SlotRule::Span { low: 0, high: 1 },
        zero_based,
        zero_based,
    ];
    // timestamp and startLock take bands 4 and 3
    let disjoint = [
        SlotRule::Anchored { base: 300, scale: 1 },
        band(0),
        band(1),
        band(2),
        band(4),
        band(3),
    ];

    TargetFunction::new(
        "Lock_c",
        "pending",
        vars(&[
            ("_data.total", State),
            ("_data.unlockedAmounts", State),
            ("_data.pending", State),
            ("_data.estUnlock", State),
            ("block.timestamp", Global),
            ("startLock", State),
            ("lockedTime", State),
            ("unlockDuration", State),
        ]),
        SafetyConstraintSet::new(vec![
            pos(3),
            pos(7),
            pos(2),
            Invariant::NonNegativeExpr {
                label: "_totalLockRemain".into(),
                expr: v(0).sub(v(1).add(v(2))),
            },
        ]),
    )
    .with_layout(Pattern::Overlap, overlap.into_iter().chain(constants).collect())
    .with_layout(Pattern::Disjoint, disjoint.into_iter().chain(constants).collect())
    .with_relaxation(Pattern::Overlap, vec![Relaxation::Shift { var: 0, by: 10 }])
    .with_relaxation(Pattern::Disjoint, vec![Relaxation::Shift { var: 0, by: 10 }])
}

fn lockup_contract() -> TargetFunction {
    use VarKind::{Global, State};
    focused(
        "LockupContract_c",
        "_getReleasedAmount",
        vars(&[
            ("block.timestamp", Global),
            ("initialAmount", State),
            ("deploymentStartTime", State),
            ("monthsToWaitBeforeUnlock", State),
            ("releaseSchedule", State),
        ]),
        vec![pos(1), non_neg(3), pos(4), ordered(2, 0)],
    )
}

fn pool_keeper() -> TargetFunction {
    use VarKind::{Global, Local};
    focused(
        "PoolKeeper_c",
        "keeperTip",
        vars(&[
            ("block.timestamp", Global),
            ("_savedPreviousUpdatedTimestamp", Local),
            ("_poolInterval", Local),
        ]),
        vec![
            pos(1),
            pos(2),
            Invariant::NonNegativeExpr {
                label: "elapsedBlocksNumerator".into(),
                expr: v(0).sub(v(1).add(v(2))),
            },
        ],
    )
}

fn thorus_bond() -> TargetFunction {
    use VarKind::{Global, State};
    focused(
        "ThorusBond_c",
        "claimablePayout",
        vars(&[
            ("block.timestamp", Global),
            ("info.lastInteractionSecond", State),
            ("info.remainingVestingSeconds", State),
            ("info.remainingPayout", State),
        ]),
        vec![pos(2), non_neg(3), ordered(1, 0)],
    )
}
