//! End-to-end runs of the `rangesynth` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn rangesynth(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rangesynth"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to execute rangesynth")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "exit={:?}\nstdout={}\nstderr={}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn targets_lists_the_builtin_catalog() -> TestResult {
    let text = rangesynth(&["targets"]);
    assert_success(&text);
    let stdout = String::from_utf8(text.stdout)?;
    assert!(stdout.contains("GovStakingStorage_c::updateRewardMultiplier"));
    assert!(stdout.contains("Lock_c"));

    let json = rangesynth(&["targets", "--format", "json"]);
    assert_success(&json);
    let targets: Value = serde_json::from_slice(&json.stdout)?;
    assert_eq!(targets.as_array().map(Vec::len), Some(7));
    Ok(())
}

#[test]
fn check_shows_the_accepted_bindings() -> TestResult {
    let output = rangesynth(&["check", "--target", "GreenHouse_c", "--delta", "3"]);
    assert_success(&output);
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("attempt   1"));
    assert!(stdout.contains("// @LocalVar amount = [100,103];"));
    Ok(())
}

#[test]
fn check_json_reports_attempts() -> TestResult {
    let output = rangesynth(&[
        "check",
        "--target",
        "GreenHouse_c",
        "--pattern",
        "disjoint",
        "--format",
        "json",
    ]);
    assert_success(&output);
    let body: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(body["accepted"], Value::Bool(true));
    assert_eq!(body["pattern"], "disjoint");
    assert_eq!(body["attempts"][0]["verdict"], "SAT");
    Ok(())
}

#[test]
fn synthesize_writes_named_documents() -> TestResult {
    let out = tempfile::tempdir()?;
    let report = out.path().join("report.json");
    let output = rangesynth(&[
        "synthesize",
        "--target",
        "Lock_c",
        "--pattern",
        "disjoint",
        "--delta",
        "1",
        "--out",
        path_arg(out.path()),
        "--report",
        path_arg(&report),
    ]);
    assert_success(&output);

    let doc: Value = serde_json::from_str(&fs::read_to_string(
        out.path().join("Lock_c_disjoint_1.json"),
    )?)?;
    let events = doc.as_array().ok_or("document is not an array")?;
    assert_eq!(events[0]["code"], "// @Debugging BEGIN");
    assert_eq!(events[0]["startLine"], 1);
    assert_eq!(events.last().map(|e| &e["code"]), Some(&Value::from("// @Debugging END")));

    let summary: Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(summary["generated"].as_array().map(Vec::len), Some(1));
    assert_eq!(summary["failures"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[test]
fn reanchor_and_rebind_round_out_a_document() -> TestResult {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("base.json");
    fs::write(
        &base,
        r#"[
  {"code":"// @Debugging BEGIN","startLine":1,"endLine":1,"event":"add"},
  {"code":"// @LocalVar amount = [1,2];","startLine":2,"endLine":2,"event":"add"},
  {"code":"// @Debugging END","startLine":3,"endLine":3,"event":"add"}
]"#,
    )?;

    let moved = dir.path().join("moved.json");
    assert_success(&rangesynth(&[
        "reanchor",
        "--input",
        path_arg(&base),
        "--offset",
        "-1",
        "--out",
        path_arg(&moved),
    ]));
    let moved_doc: Value = serde_json::from_str(&fs::read_to_string(&moved)?)?;
    assert_eq!(moved_doc[0]["startLine"], 0);
    assert_eq!(moved_doc[2]["endLine"], 2);

    let ranges = dir.path().join("ranges.json");
    fs::write(&ranges, r#"[{"low":40,"high":45}]"#)?;
    let rebound = dir.path().join("rebound.json");
    assert_success(&rangesynth(&[
        "rebind",
        "--base",
        path_arg(&base),
        "--ranges",
        path_arg(&ranges),
        "--out",
        path_arg(&rebound),
    ]));
    let rebound_doc: Value = serde_json::from_str(&fs::read_to_string(&rebound)?)?;
    assert_eq!(rebound_doc[1]["code"], "// @LocalVar amount = [40,45];");
    assert_eq!(rebound_doc[1]["startLine"], 2);
    Ok(())
}

#[test]
fn offsets_then_propagate_moves_documents_onto_mutants() -> TestResult {
    let root = tempfile::tempdir()?;
    let configs = root.path().join("configs");
    let annotations = root.path().join("annotations");
    let mutants = root.path().join("mutants");
    let out = root.path().join("mutated");
    fs::create_dir_all(&annotations)?;
    fs::create_dir_all(&mutants)?;

    assert_success(&rangesynth(&[
        "synthesize",
        "--target",
        "GreenHouse_c",
        "--pattern",
        "overlap",
        "--delta",
        "3",
        "--out",
        path_arg(&configs),
    ]));

    fs::write(
        annotations.join("GreenHouse_c_annot.json"),
        r#"[{"code":"// @Debugging BEGIN","startLine":30,"endLine":30,"event":"add"}]"#,
    )?;
    fs::write(
        mutants.join("GreenHouse_c__calculateFees_add_to_sub.sol"),
        "contract M {}",
    )?;

    let offsets = root.path().join("offsets.json");
    assert_success(&rangesynth(&[
        "offsets",
        "--annotations",
        path_arg(&annotations),
        "--out",
        path_arg(&offsets),
    ]));
    let table: Value = serde_json::from_str(&fs::read_to_string(&offsets)?)?;
    assert_eq!(table["GreenHouse_c"], 30);

    assert_success(&rangesynth(&[
        "propagate",
        "--mutants",
        path_arg(&mutants),
        "--configs",
        path_arg(&configs),
        "--offsets",
        path_arg(&offsets),
        "--out",
        path_arg(&out),
    ]));
    let doc: Value = serde_json::from_str(&fs::read_to_string(
        out.join("GreenHouse_c__calculateFees_add_to_sub_overlap_3.json"),
    )?)?;
    assert_eq!(doc[0]["startLine"], 30);
    assert_eq!(doc[1]["code"], "// @LocalVar amount = [100,103];");
    assert_eq!(doc[1]["startLine"], 31);
    Ok(())
}

#[test]
fn unknown_target_fails() {
    let output = rangesynth(&["check", "--target", "Nope_c"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Nope_c"));
}

#[test]
fn infeasible_custom_target_reports_failure() -> TestResult {
    let dir = tempfile::tempdir()?;
    let catalog = dir.path().join("catalog.json");
    fs::write(
        &catalog,
        r#"[{
  "id": "Never_c",
  "function": "impossible",
  "variables": [{"expression": "x", "kind": "local", "position": 0}],
  "constraints": {
    "invariants": [
      {"kind": "positive", "var": 0},
      {"kind": "at_most", "var": 0, "bound": 0}
    ]
  }
}]"#,
    )?;
    let out = dir.path().join("out");
    let output = rangesynth(&[
        "--catalog",
        path_arg(&catalog),
        "synthesize",
        "--target",
        "Never_c",
        "--pattern",
        "overlap",
        "--delta",
        "1",
        "--max-tries",
        "2",
        "--out",
        path_arg(&out),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FAILED Never_c overlap"));
    assert!(!out.join("Never_c_overlap_1.json").exists());
    Ok(())
}

#[test]
fn missing_input_names_the_file_and_the_cause() -> TestResult {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.json");
    let output = rangesynth(&[
        "reanchor",
        "--input",
        path_arg(&missing),
        "--offset",
        "3",
        "--out",
        path_arg(&dir.path().join("out.json")),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.json"));
    assert!(stderr.contains("I/O error"));
    Ok(())
}
