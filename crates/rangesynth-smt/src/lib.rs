#![doc = include_str!("../README.md")]

//! Integer SMT plumbing for range synthesis.
//!
//! Terms are built once per feasibility check, translated by a backend and
//! discarded; nothing here keeps state across checks except the solver
//! instance itself, which callers `reset` between candidates.

pub mod backends;
pub mod solver;
pub mod sorts;
pub mod terms;
