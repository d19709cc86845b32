use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::propagate::PropagationError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A range list and its descriptor list disagree in length. This is a
    /// caller bug, never a data condition, so batches abort on it.
    #[error("Structural mismatch for `{target}`: {expected} variables but {actual} intervals")]
    StructuralMismatch {
        target: String,
        expected: usize,
        actual: usize,
    },
    #[error("Solver error: {0}")]
    Solver(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error("Annotation error: {0}")]
    Annotation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        EngineError::Json {
            path: path.into(),
            source,
        }
    }

    /// True for errors that indicate a programming-contract violation and
    /// must stop a batch instead of being recorded per configuration.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, EngineError::StructuralMismatch { .. })
    }
}
