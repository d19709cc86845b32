// Command handler for: Targets
//
// Lists every target function in the catalog with its variables and the
// invariants each pattern activates.

use miette::IntoDiagnostic;

use rangesynth_engine::catalog::Catalog;

use super::helpers::parse_output_format;
use crate::OutputFormat;

pub(crate) fn run_targets_command(catalog: &Catalog, format: &str) -> miette::Result<()> {
    match parse_output_format(format)? {
        OutputFormat::Json => {
            let targets: Vec<_> = catalog.iter().collect();
            println!("{}", serde_json::to_string_pretty(&targets).into_diagnostic()?);
        }
        OutputFormat::Text => {
            for target in catalog.iter() {
                println!(
                    "{}::{} ({} variables, {})",
                    target.id,
                    target.function,
                    target.variables.len(),
                    target.constraints.quantification
                );
                for var in &target.variables {
                    println!("  [{}] {} {}", var.position, var.kind.tag(), var.expression);
                }
                for invariant in &target.constraints.invariants {
                    println!("  always: {}", invariant.describe(&target.variables));
                }
                for (pattern, invariants) in &target.constraints.pattern_invariants {
                    for invariant in invariants {
                        println!("  {pattern}: {}", invariant.describe(&target.variables));
                    }
                }
            }
        }
    }
    Ok(())
}
