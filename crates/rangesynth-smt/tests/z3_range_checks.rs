//! Range-shaped formulas through the public solver API: one bounded integer
//! per variable plus an arithmetic guard, the way the engine drives Z3.

use rangesynth_smt::backends::smtlib_printer;
use rangesynth_smt::backends::z3_backend::Z3Solver;
use rangesynth_smt::solver::{SatResult, SmtSolver};
use rangesynth_smt::sorts::SmtSort;
use rangesynth_smt::terms::SmtTerm;

/// Helper: check a formula with Z3 and return the result.
fn z3_check(setup: impl FnOnce(&mut Z3Solver)) -> SatResult {
    let mut solver = Z3Solver::new();
    setup(&mut solver);
    solver.check_sat().unwrap()
}

#[test]
fn remaining_amount_guard_sat_when_total_can_cover_pending() {
    // total >= unlocked + pending with total in [200,203], others in [0,3]
    let result = z3_check(|s| {
        for name in ["total", "unlocked", "pending"] {
            s.declare_var(name, &SmtSort::Int).unwrap();
        }
        s.assert(&SmtTerm::var("total").within(200, 203)).unwrap();
        s.assert(&SmtTerm::var("unlocked").within(0, 3)).unwrap();
        s.assert(&SmtTerm::var("pending").within(0, 3)).unwrap();
        s.assert(
            &SmtTerm::var("total").ge(SmtTerm::var("unlocked").add(SmtTerm::var("pending"))),
        )
        .unwrap();
    });
    assert_eq!(result, SatResult::Sat);
}

#[test]
fn elapsed_time_guard_unsat_when_bands_are_inverted() {
    // timestamp in [0,3], saved + interval in [8,12]: subtraction always underflows
    let result = z3_check(|s| {
        for name in ["ts", "saved", "interval"] {
            s.declare_var(name, &SmtSort::Int).unwrap();
        }
        s.assert(&SmtTerm::var("ts").within(0, 3)).unwrap();
        s.assert(&SmtTerm::var("saved").within(4, 7)).unwrap();
        s.assert(&SmtTerm::var("interval").within(4, 5)).unwrap();
        s.assert(
            &SmtTerm::var("ts")
                .sub(SmtTerm::var("saved").add(SmtTerm::var("interval")))
                .ge(SmtTerm::int(0)),
        )
        .unwrap();
    });
    assert_eq!(result, SatResult::Unsat);
}

#[test]
fn printed_script_mentions_every_declaration() {
    let decls = vec![
        ("v0".to_string(), SmtSort::Int),
        ("v1".to_string(), SmtSort::Int),
    ];
    let text = smtlib_printer::script(
        &decls,
        &[SmtTerm::var("v0").sub(SmtTerm::var("v1")).ge(SmtTerm::int(0))],
    );
    assert!(text.contains("(declare-fun v0 () Int)"));
    assert!(text.contains("(declare-fun v1 () Int)"));
    assert!(text.contains("(assert (>= (- v0 v1) 0))"));
    assert!(text.ends_with("(check-sat)\n"));
}
