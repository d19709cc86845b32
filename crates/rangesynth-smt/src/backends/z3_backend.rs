use std::collections::HashMap;

use thiserror::Error;
use z3::SatResult as Z3SatResult;

use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
}

pub struct Z3Solver {
    solver: z3::Solver,
    int_vars: HashMap<String, z3::ast::Int>,
    params: Option<z3::Params>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            int_vars: HashMap::new(),
            params: None,
        }
    }

    /// Solver whose individual `check` calls give up after `timeout_secs`.
    ///
    /// Zero means no per-check limit.
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout_ms = timeout_secs.saturating_mul(1000).min(u64::from(u32::MAX)) as u32;
        params.set_u32("timeout", timeout_ms);
        solver.set_params(&params);
        Self {
            solver,
            int_vars: HashMap::new(),
            params: Some(params),
        }
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => {
                let v = self
                    .int_vars
                    .get(name)
                    .ok_or_else(|| Z3Error::UnknownVariable(name.clone()))?;
                Ok(Z3Term::Int(v.clone()))
            }
            SmtTerm::IntLit(n) => Ok(Z3Term::Int(z3::ast::Int::from_i64(*n))),
            SmtTerm::Add(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Int(&l + &r))
            }
            SmtTerm::Sub(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Int(&l - &r))
            }
            SmtTerm::Mul(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Int(&l * &r))
            }
            SmtTerm::Div(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Int(l.div(&r)))
            }
            SmtTerm::Eq(lhs, rhs) => {
                let l = self.translate_term(lhs)?;
                let r = self.translate_term(rhs)?;
                match (l, r) {
                    (Z3Term::Int(li), Z3Term::Int(ri)) => Ok(Z3Term::Bool(li.eq(&ri))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    _ => Err(Z3Error::Internal("Sort mismatch in Eq".into())),
                }
            }
            SmtTerm::Lt(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.lt(&r)))
            }
            SmtTerm::Le(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.le(&r)))
            }
            SmtTerm::Gt(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.gt(&r)))
            }
            SmtTerm::Ge(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.ge(&r)))
            }
            SmtTerm::And(terms) => {
                let bools = self.bool_list(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
        }
    }

    fn int_pair(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
    ) -> Result<(z3::ast::Int, z3::ast::Int), Z3Error> {
        let l = self.translate_term(lhs)?.into_int()?;
        let r = self.translate_term(rhs)?.into_int()?;
        Ok((l, r))
    }

    fn bool_list(&self, terms: &[SmtTerm]) -> Result<Vec<z3::ast::Bool>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(|z| z.into_bool()))
            .collect()
    }

    fn map_verdict(result: Z3SatResult) -> SatResult {
        match result {
            Z3SatResult::Sat => SatResult::Sat,
            Z3SatResult::Unsat => SatResult::Unsat,
            Z3SatResult::Unknown => SatResult::Unknown("Z3 returned unknown".into()),
        }
    }
}

enum Z3Term {
    Int(z3::ast::Int),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            Z3Term::Bool(_) => Err(Z3Error::Internal("Expected Int, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) => Err(Z3Error::Internal("Expected Bool, got Int".into())),
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn name(&self) -> &'static str {
        "z3"
    }

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        match sort {
            SmtSort::Int => {
                let v = z3::ast::Int::new_const(name);
                self.int_vars.insert(name.to_string(), v);
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        Ok(Self::map_verdict(self.solver.check()))
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => {}
            other => return Ok((Self::map_verdict(other), None)),
        }

        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
        let mut values = HashMap::new();

        for &(name, sort) in var_names {
            match sort {
                SmtSort::Int => {
                    let Some(v) = self.int_vars.get(name) else {
                        return Err(Z3Error::UnknownVariable(name.to_string()));
                    };
                    if let Some(n) = z3_model
                        .eval::<z3::ast::Int>(v, true)
                        .and_then(|val| val.as_i64())
                    {
                        values.insert(name.to_string(), ModelValue::Int(n));
                    }
                }
            }
        }

        Ok((SatResult::Sat, Some(Model { values })))
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 drops per-solver parameters on reset.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.int_vars.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn z3_bounded_ints_sat() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("total", &SmtSort::Int)?;
        solver.declare_var("consumed", &SmtSort::Int)?;

        solver.assert(&SmtTerm::var("total").within(5, 8))?;
        solver.assert(&SmtTerm::var("consumed").within(6, 9))?;
        solver.assert(
            &SmtTerm::var("total")
                .sub(SmtTerm::var("consumed"))
                .ge(SmtTerm::int(0)),
        )?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        Ok(())
    }

    #[test]
    fn z3_disjoint_bounds_unsat() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").within(0, 3))?;
        solver.assert(&SmtTerm::var("x").gt(SmtTerm::int(3)))?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        Ok(())
    }

    #[test]
    fn z3_integer_division_truncates() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("period", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("period").eq(SmtTerm::int(604_799)))?;
        // One second short of a week still divides to zero weeks.
        solver.assert(
            &SmtTerm::var("period")
                .div(SmtTerm::int(604_800))
                .ge(SmtTerm::int(1)),
        )?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        Ok(())
    }

    #[test]
    fn z3_model_extraction() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("v0", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("v0").eq(SmtTerm::int(42)))?;

        let vars = vec![("v0", &SmtSort::Int)];
        let (result, model) = solver.check_sat_with_model(&vars)?;
        assert_eq!(result, SatResult::Sat);
        let model = model.ok_or_else(|| std::io::Error::other("expected model for SAT result"))?;
        assert_eq!(model.get_int("v0"), Some(42));
        Ok(())
    }

    #[test]
    fn z3_model_request_for_undeclared_var_is_an_error() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("v0", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("v0").eq(SmtTerm::int(1)))?;
        let vars = vec![("v1", &SmtSort::Int)];
        assert!(matches!(
            solver.check_sat_with_model(&vars),
            Err(Z3Error::UnknownVariable(name)) if name == "v1"
        ));
        Ok(())
    }

    #[test]
    fn z3_reset_clears_declarations_and_keeps_timeout() -> TestResult {
        let mut solver = Z3Solver::with_timeout_secs(2);
        assert!(solver.params.is_some());

        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(1)))?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);

        solver.reset()?;
        assert!(matches!(
            solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(2))),
            Err(Z3Error::UnknownVariable(_))
        ));
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(2)))?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        assert!(solver.params.is_some());
        Ok(())
    }
}
