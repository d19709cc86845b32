#![doc = include_str!("../README.md")]

//! Range synthesis engine.
//!
//! The catalog holds per-function configuration; everything downstream of it
//! is a pure function of `(target, pattern, delta)` except the solver call
//! and the final document write.

pub mod annotation;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod constraints;
pub mod error;
pub mod model;
pub mod pattern;
pub mod propagate;
pub mod widening;

pub use error::EngineError;
