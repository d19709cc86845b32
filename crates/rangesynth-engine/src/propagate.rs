//! Propagation of synthesized annotations onto mutated contract variants.
//!
//! A mutant keeps the base contract's debug block shape, so its annotation is
//! the base document moved by a constant line offset.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::AnnotationDocument;
use crate::error::EngineError;
use crate::model::Pattern;

/// Contract marker that terminates every base identifier.
pub const CONTRACT_MARKER: &str = "_c";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropagationError {
    #[error("Malformed mutant identifier `{name}`: {reason}")]
    MalformedIdentifier { name: String, reason: String },
    #[error("Ambiguous mutant identifier `{name}`: candidate bases {}", candidates.join(", "))]
    AmbiguousIdentifier {
        name: String,
        candidates: Vec<String>,
    },
    #[error("No base annotation offset recorded for `{contract}`")]
    MissingBaseAnnotation { contract: String },
    #[error("Document for `{mutant}` has no BEGIN record to anchor on")]
    MissingBeginRecord { mutant: String },
}

/// Move every line of `doc` by `offset`.
pub fn reanchor(doc: &AnnotationDocument, offset: i64) -> AnnotationDocument {
    doc.shifted(offset)
}

/// `contractId -> line` of the BEGIN record in the unmodified contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OffsetTable(IndexMap<String, i64>);

impl OffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: impl Into<String>, anchor: i64) {
        self.0.insert(contract.into(), anchor);
    }

    pub fn anchor(&self, contract: &str) -> Option<i64> {
        self.0.get(contract).copied()
    }

    /// Line shift for a document whose BEGIN record sits at line 1.
    pub fn offset_for(&self, contract: &str) -> Result<i64, PropagationError> {
        self.anchor(contract)
            .map(|anchor| anchor - 1)
            .ok_or_else(|| PropagationError::MissingBaseAnnotation {
                contract: contract.to_string(),
            })
    }

    pub fn contains(&self, contract: &str) -> bool {
        self.0.contains_key(contract)
    }

    pub fn contracts(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn read(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| EngineError::json(path, e))
    }

    pub fn write(&self, path: &Path) -> Result<(), EngineError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| EngineError::json(path, e))?;
        crate::annotation::write_atomic(path, text.as_bytes())
    }
}

impl FromIterator<(String, i64)> for OffsetTable {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Arithmetic-operator mutation applied to a base contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    SubToAdd,
    AddToSub,
    SwapAddSub,
    SwapMulDiv,
    OriginalHasDivision,
}

impl MutationKind {
    pub const ALL: [MutationKind; 5] = [
        MutationKind::SubToAdd,
        MutationKind::AddToSub,
        MutationKind::SwapAddSub,
        MutationKind::SwapMulDiv,
        MutationKind::OriginalHasDivision,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::SubToAdd => "sub_to_add",
            MutationKind::AddToSub => "add_to_sub",
            MutationKind::SwapAddSub => "swap_add_sub",
            MutationKind::SwapMulDiv => "swap_mul_div",
            MutationKind::OriginalHasDivision => "original_has_division",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<base>_<function>_<mutationKind>`, e.g.
/// `HubPool_c__allocateLpAndProtocolFees_swap_mul_div`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutantId {
    pub base: String,
    pub function: String,
    pub mutation: MutationKind,
}

impl MutantId {
    pub fn parse(name: &str) -> Result<Self, PropagationError> {
        Self::parse_with_known(name, |_| true)
    }

    /// Parse, resolving several possible `_c_` splits with `is_known_base`.
    pub fn parse_with_known(
        name: &str,
        is_known_base: impl Fn(&str) -> bool,
    ) -> Result<Self, PropagationError> {
        let malformed = |reason: &str| PropagationError::MalformedIdentifier {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        let delimiter = format!("{CONTRACT_MARKER}_");
        let splits: Vec<usize> = name
            .match_indices(&delimiter)
            .map(|(i, _)| i + CONTRACT_MARKER.len())
            .filter(|&end| end > CONTRACT_MARKER.len())
            .collect();
        if splits.is_empty() {
            return Err(malformed("missing `_c` contract marker"));
        }

        let mut candidates: Vec<MutantId> = splits
            .into_iter()
            .filter_map(|end| {
                let base = &name[..end];
                let rest = &name[end + 1..];
                let (function, mutation) = split_mutation(rest)?;
                Some(MutantId {
                    base: base.to_string(),
                    function: function.to_string(),
                    mutation,
                })
            })
            .collect();

        match candidates.len() {
            0 => Err(malformed(
                "expected `<base>_c_<function>_<mutation>` with a known mutation kind",
            )),
            1 => Ok(candidates.remove(0)),
            _ => {
                let mut known: Vec<MutantId> = candidates
                    .iter()
                    .filter(|c| is_known_base(&c.base))
                    .cloned()
                    .collect();
                if known.len() == 1 {
                    Ok(known.remove(0))
                } else {
                    Err(PropagationError::AmbiguousIdentifier {
                        name: name.to_string(),
                        candidates: candidates.into_iter().map(|c| c.base).collect(),
                    })
                }
            }
        }
    }
}

fn split_mutation(rest: &str) -> Option<(&str, MutationKind)> {
    MutationKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let function = rest.strip_suffix(kind.as_str())?.strip_suffix('_')?;
            (!function.is_empty()).then_some((function, kind))
        })
        .max_by_key(|(_, kind)| kind.as_str().len())
}

impl fmt::Display for MutantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.base, self.function, self.mutation)
    }
}

/// `{id}_{pattern}_{delta}.json`.
pub fn synthesized_file_name(id: &str, pattern: Pattern, delta: u32) -> String {
    format!("{id}_{pattern}_{delta}.json")
}

/// Parse the `{pattern}_{delta}.json` tail of a synthesized file name.
pub fn parse_config_suffix(suffix: &str) -> Option<(Pattern, u32)> {
    let stem = suffix.strip_suffix(".json")?;
    let (pattern, delta) = stem.rsplit_once('_')?;
    Some((pattern.parse().ok()?, delta.parse().ok()?))
}

/// `{mutant}_{suffix}` where `suffix` is the synthesized file name after `{base}_`.
pub fn propagated_file_name(mutant: &MutantId, suffix: &str) -> String {
    format!("{mutant}_{suffix}")
}

/// Re-anchor a base document for `mutant`. The shift is relative to the
/// document's own BEGIN line, so documents synthesized at line 1 move by
/// exactly `anchor - 1`.
pub fn propagate(
    doc: &AnnotationDocument,
    mutant: &MutantId,
    offsets: &OffsetTable,
) -> Result<AnnotationDocument, PropagationError> {
    let offset = offsets.offset_for(&mutant.base)?;
    let begin = doc
        .begin_line()
        .ok_or_else(|| PropagationError::MissingBeginRecord {
            mutant: mutant.to_string(),
        })?;
    Ok(reanchor(doc, offset - (begin - 1)))
}
