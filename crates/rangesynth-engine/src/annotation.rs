//! Annotation event documents.
//!
//! An annotation document is the JSON array the debugger consumes: a BEGIN
//! marker, one binding record per variable, an END marker, each an `add` edit
//! at its own source line.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::TargetFunction;
use crate::error::EngineError;
use crate::model::{Interval, ObservedInterval, RangeAssignment, VarKind};

pub const BEGIN_MARKER: &str = "// @Debugging BEGIN";
pub const END_MARKER: &str = "// @Debugging END";
/// Substrings that identify the opening record of a debug block.
pub const BEGIN_SENTINELS: [&str; 2] = ["@Debugging BEGIN", "@TestCase BEGIN"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationEvent {
    pub code: String,
    pub start_line: i64,
    pub end_line: i64,
    pub event: EditKind,
}

impl AnnotationEvent {
    pub fn add(code: impl Into<String>, line: i64) -> Self {
        Self {
            code: code.into(),
            start_line: line,
            end_line: line,
            event: EditKind::Add,
        }
    }

    pub fn is_begin(&self) -> bool {
        BEGIN_SENTINELS.iter().any(|s| self.code.contains(s))
    }
}

/// A parsed `// @<Kind>Var <expression> = [<low>,<high>];` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub kind: VarKind,
    pub expression: String,
    pub value: ObservedInterval,
}

pub fn binding_code(kind: VarKind, expression: &str, interval: Interval) -> String {
    format!("// {} {expression} = {interval};", kind.tag())
}

/// Parse a binding record. Returns `None` for markers and anything else that
/// is not a variable binding.
pub fn parse_binding(code: &str) -> Option<Binding> {
    let body = code.trim().strip_prefix("//")?.trim();
    let (tag, rest) = body.split_once(char::is_whitespace)?;
    let kind = VarKind::from_tag(tag)?;
    let (expression, value) = rest.split_once('=')?;
    let expression = expression.trim();
    if expression.is_empty() {
        return None;
    }
    let value = value.trim();
    let value = value.strip_suffix(';').unwrap_or(value).trim();
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    let (lo, hi) = inner.split_once(',')?;
    let low: i64 = lo.trim().parse().ok()?;
    let value = match hi.trim() {
        "inf" | "+inf" => ObservedInterval::UnboundedAbove { low },
        hi => ObservedInterval::Bounded(Interval::new(low, hi.parse().ok()?)?),
    };
    Some(Binding {
        kind,
        expression: expression.to_string(),
        value,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationDocument {
    events: Vec<AnnotationEvent>,
}

impl AnnotationDocument {
    pub fn from_events(events: Vec<AnnotationEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[AnnotationEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<AnnotationEvent> {
        self.events
    }

    pub fn bindings(&self) -> impl Iterator<Item = Binding> + '_ {
        self.events.iter().filter_map(|e| parse_binding(&e.code))
    }

    pub fn intervals(&self) -> Vec<ObservedInterval> {
        self.bindings().map(|b| b.value).collect()
    }

    /// Line of the first BEGIN record, if any.
    pub fn begin_line(&self) -> Option<i64> {
        self.events
            .iter()
            .find(|e| e.is_begin())
            .map(|e| e.start_line)
    }

    /// Every line number moved by `offset`.
    pub fn shifted(&self, offset: i64) -> Self {
        Self {
            events: self
                .events
                .iter()
                .map(|e| AnnotationEvent {
                    start_line: e.start_line.saturating_add(offset),
                    end_line: e.end_line.saturating_add(offset),
                    ..e.clone()
                })
                .collect(),
        }
    }

    /// Replace the interval of each binding record, in document order, with
    /// the matching entry of `ranges`. Markers, line numbers and any other
    /// record stay as they are.
    pub fn rebind(&self, ranges: &RangeAssignment) -> Result<Self, EngineError> {
        let bound = self.bindings().count();
        if bound != ranges.len() {
            return Err(EngineError::StructuralMismatch {
                target: "annotation document".into(),
                expected: bound,
                actual: ranges.len(),
            });
        }
        let mut next = ranges.iter();
        let events = self
            .events
            .iter()
            .map(|event| {
                let Some(binding) = parse_binding(&event.code) else {
                    return event.clone();
                };
                match next.next() {
                    Some(interval) => AnnotationEvent {
                        code: binding_code(binding.kind, &binding.expression, *interval),
                        ..event.clone()
                    },
                    None => event.clone(),
                }
            })
            .collect();
        Ok(Self { events })
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn read(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_json_str(&text).map_err(|e| EngineError::json(path, e))
    }

    /// Write to a temporary sibling, then rename over `path`.
    pub fn write_atomic(&self, path: &Path) -> Result<(), EngineError> {
        let text = self
            .to_json_string()
            .map_err(|e| EngineError::json(path, e))?;
        write_atomic(path, text.as_bytes())
    }
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EngineError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Unique sibling per write; dropped (and removed) if persisting fails.
    let mut tmp = tempfile::Builder::new()
        .prefix(".rangesynth-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| EngineError::io(dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| EngineError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map(|_| ())
        .map_err(|e| EngineError::io(path, e.error))
}

/// Emit the annotation document for `ranges` with the BEGIN marker at
/// `start_line`.
pub fn serialize(
    target: &TargetFunction,
    ranges: &RangeAssignment,
    start_line: i64,
) -> Result<AnnotationDocument, EngineError> {
    if ranges.len() != target.variables.len() {
        return Err(EngineError::StructuralMismatch {
            target: target.id.clone(),
            expected: target.variables.len(),
            actual: ranges.len(),
        });
    }
    let mut events = Vec::with_capacity(ranges.len() + 2);
    let mut line = start_line;
    events.push(AnnotationEvent::add(BEGIN_MARKER, line));
    for (var, interval) in target.variables.iter().zip(ranges.iter()) {
        line += 1;
        events.push(AnnotationEvent::add(
            binding_code(var.kind, &var.expression, *interval),
            line,
        ));
    }
    events.push(AnnotationEvent::add(END_MARKER, line + 1));
    Ok(AnnotationDocument::from_events(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::SafetyConstraintSet;
    use crate::model::VariableDescriptor;

    fn target() -> TargetFunction {
        TargetFunction::new(
            "Bond_c",
            "claimablePayout",
            vec![
                VariableDescriptor::new("block.timestamp", VarKind::Global, 0),
                VariableDescriptor::new("info.remainingPayout", VarKind::State, 1),
            ],
            SafetyConstraintSet::default(),
        )
    }

    fn ranges(pairs: &[(i64, i64)]) -> RangeAssignment {
        pairs
            .iter()
            .map(|&(lo, hi)| Interval::new(lo, hi).unwrap())
            .collect()
    }

    #[test]
    fn serialize_brackets_bindings_with_markers() {
        let doc = serialize(&target(), &ranges(&[(100, 103), (-2, 5)]), 1).unwrap();
        let codes: Vec<&str> = doc.events().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "// @Debugging BEGIN",
                "// @GlobalVar block.timestamp = [100,103];",
                "// @StateVar info.remainingPayout = [-2,5];",
                "// @Debugging END",
            ]
        );
        let lines: Vec<i64> = doc.events().iter().map(|e| e.start_line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
        assert!(doc.events().iter().all(|e| e.start_line == e.end_line));
        assert_eq!(doc.begin_line(), Some(1));
    }

    #[test]
    fn serialize_rejects_length_mismatch() {
        let err = serialize(&target(), &ranges(&[(1, 2)]), 1).unwrap_err();
        assert!(matches!(
            err,
            EngineError::StructuralMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn json_shape_uses_camel_case_and_add() {
        let doc = serialize(&target(), &ranges(&[(1, 1), (2, 2)]), 40).unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc.to_json_string().unwrap()).unwrap();
        assert_eq!(value[0]["startLine"], 40);
        assert_eq!(value[0]["endLine"], 40);
        assert_eq!(value[0]["event"], "add");
        assert_eq!(value[3]["code"], "// @Debugging END");
    }

    #[test]
    fn parse_binding_accepts_open_and_unterminated_records() {
        let open = parse_binding("// @LocalVar amount = [7,inf];").unwrap();
        assert_eq!(open.value, ObservedInterval::UnboundedAbove { low: 7 });

        let plain = parse_binding("// @StateVar pooledTokens[l1Token].utilizedReserves = [0,21]").unwrap();
        assert_eq!(plain.kind, VarKind::State);
        assert_eq!(plain.expression, "pooledTokens[l1Token].utilizedReserves");
        assert_eq!(
            plain.value,
            ObservedInterval::Bounded(Interval::new(0, 21).unwrap())
        );

        assert!(parse_binding(BEGIN_MARKER).is_none());
        assert!(parse_binding("// @LocalVar x = [5,4];").is_none());
        assert!(parse_binding("// @Whatever x = [1,2];").is_none());
    }

    #[test]
    fn rebind_replaces_only_binding_intervals() {
        let base = AnnotationDocument::from_events(vec![
            AnnotationEvent::add("// @TestCase BEGIN", 41),
            AnnotationEvent::add("// @GlobalVar block.timestamp = [0,0]", 42),
            AnnotationEvent::add("// a note", 43),
            AnnotationEvent::add("// @StateVar info.remainingPayout = [0,0]", 44),
            AnnotationEvent::add("// @TestCase END", 45),
        ]);
        let rebound = base.rebind(&ranges(&[(10, 12), (3, 4)])).unwrap();
        assert_eq!(rebound.events()[0], base.events()[0]);
        assert_eq!(rebound.events()[2], base.events()[2]);
        assert_eq!(
            rebound.events()[3].code,
            "// @StateVar info.remainingPayout = [3,4];"
        );
        assert_eq!(rebound.events()[1].start_line, 42);
        assert_eq!(rebound.begin_line(), Some(41));

        assert!(base.rebind(&ranges(&[(1, 1)])).is_err());
    }

    #[test]
    fn atomic_write_leaves_no_temporary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bond_c_overlap_3.json");
        let doc = serialize(&target(), &ranges(&[(1, 4), (2, 5)]), 1).unwrap();
        doc.write_atomic(&path).unwrap();
        assert_eq!(AnnotationDocument::read(&path).unwrap(), doc);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn concurrent_writes_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bond_c_overlap_1.json");
        let doc = serialize(&target(), &ranges(&[(1, 2), (3, 4)]), 1).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| doc.write_atomic(&path)))
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }
        });
        assert_eq!(AnnotationDocument::read(&path).unwrap(), doc);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
