//! Batch parameters.

use std::path::Path;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::model::Pattern;
use crate::widening::DEFAULT_MAX_TRIES;

pub const DEFAULT_DELTAS: [u32; 5] = [1, 3, 6, 10, 15];

/// Parameters of a synthesis batch. Every field is optional in JSON; an empty
/// `targets` list means every catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub targets: Vec<String>,
    pub patterns: Vec<Pattern>,
    pub deltas: Vec<u32>,
    pub max_tries: u32,
    pub start_line: i64,
    pub workers: usize,
    pub solver_timeout_secs: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            patterns: Pattern::ALL.to_vec(),
            deltas: DEFAULT_DELTAS.to_vec(),
            max_tries: DEFAULT_MAX_TRIES,
            start_line: 1,
            workers: 1,
            solver_timeout_secs: None,
        }
    }
}

/// One `(target, pattern, delta)` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    pub target: String,
    pub pattern: Pattern,
    pub delta: u32,
}

impl BatchConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| EngineError::json(path, e))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.patterns.is_empty() {
            return Err(EngineError::Config("no patterns selected".into()));
        }
        if self.deltas.is_empty() {
            return Err(EngineError::Config("no deltas selected".into()));
        }
        if self.workers == 0 {
            return Err(EngineError::Config("workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Cross product in target, pattern, delta order, without repeats, so
    /// every job owns a distinct output file. Unknown targets are an error
    /// rather than an empty batch.
    pub fn jobs(&self, catalog: &Catalog) -> Result<Vec<Job>, EngineError> {
        self.validate()?;
        let targets: Vec<String> = if self.targets.is_empty() {
            catalog.ids().map(str::to_string).collect()
        } else {
            for id in &self.targets {
                catalog.get(id)?;
            }
            self.targets.clone()
        };
        let mut jobs = IndexSet::with_capacity(targets.len() * self.patterns.len() * self.deltas.len());
        for target in &targets {
            for &pattern in &self.patterns {
                for &delta in &self.deltas {
                    jobs.insert(Job {
                        target: target.clone(),
                        pattern,
                        delta,
                    });
                }
            }
        }
        Ok(jobs.into_iter().collect())
    }
}
