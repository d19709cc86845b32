// Command handler for: Check
//
// Runs the widening search for a single (target, pattern, delta) and shows
// every candidate the solver saw. Nothing is written unless --dump-smt is set.

use std::path::Path;

use miette::{IntoDiagnostic, WrapErr};
use serde_json::json;

use rangesynth_engine::annotation::binding_code;
use rangesynth_engine::catalog::Catalog;
use rangesynth_engine::constraints::{CheckOutcome, ConstraintModel};
use rangesynth_engine::widening::synthesize_observed;

use super::helpers::{make_solver, parse_output_format, parse_pattern};
use crate::OutputFormat;

#[allow(clippy::too_many_arguments)]
pub(crate) fn run_check_command(
    catalog: &Catalog,
    target_id: &str,
    pattern: &str,
    delta: u32,
    max_tries: u32,
    timeout: Option<u64>,
    dump_smt: Option<&Path>,
    format: &str,
) -> miette::Result<()> {
    let output = parse_output_format(format)?;
    let pattern = parse_pattern(pattern)?;
    let target = catalog.get(target_id).into_diagnostic()?;
    let mut solver = make_solver(timeout);

    let mut attempts = Vec::new();
    let result = synthesize_observed(&mut solver, target, pattern, delta, max_tries, |attempt| {
        if output == OutputFormat::Text {
            println!(
                "attempt {:>3}: {} -> {}",
                attempt.number, attempt.ranges, attempt.outcome
            );
        }
        attempts.push(json!({
            "attempt": attempt.number,
            "ranges": attempt.ranges,
            "verdict": attempt.outcome.to_string(),
            "witness": match attempt.outcome {
                CheckOutcome::Sat { witness } => Some(witness.clone()),
                _ => None,
            },
        }));
    });

    let synthesis = match result {
        Ok(synthesis) => synthesis,
        Err(e) => {
            if output == OutputFormat::Json {
                let body = json!({
                    "target": target.id,
                    "pattern": pattern,
                    "delta": delta,
                    "accepted": false,
                    "attempts": attempts,
                });
                println!("{}", serde_json::to_string_pretty(&body).into_diagnostic()?);
            }
            return Err(e).into_diagnostic();
        }
    };

    if let Some(path) = dump_smt {
        let script = ConstraintModel::new(target, pattern)
            .to_smtlib(&synthesis.ranges)
            .into_diagnostic()?;
        std::fs::write(path, script)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    }

    let bindings: Vec<String> = target
        .variables
        .iter()
        .zip(synthesis.ranges.iter())
        .map(|(var, interval)| binding_code(var.kind, &var.expression, *interval))
        .collect();

    match output {
        OutputFormat::Text => {
            println!(
                "accepted after {} attempt(s); witness {:?}",
                synthesis.attempts, synthesis.witness
            );
            for line in &bindings {
                println!("  {line}");
            }
        }
        OutputFormat::Json => {
            let body = json!({
                "target": target.id,
                "pattern": pattern,
                "delta": delta,
                "accepted": true,
                "attempts": attempts,
                "ranges": synthesis.ranges,
                "witness": synthesis.witness,
                "bindings": bindings,
            });
            println!("{}", serde_json::to_string_pretty(&body).into_diagnostic()?);
        }
    }
    Ok(())
}
