//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rangesynth_engine::widening::DEFAULT_MAX_TRIES;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Synthesizes integer input ranges that keep a target function's safety \
    invariants satisfiable and writes them as line-indexed debug annotations.\n\n\
    Typical flow:\n  \
    1. rangesynth synthesize --out configs\n  \
    2. rangesynth offsets --annotations base_annotations --out offsets.json\n  \
    3. rangesynth propagate --mutants mutants --configs configs --offsets offsets.json --out mutated";

#[derive(Parser)]
#[command(name = "rangesynth")]
#[command(about = "Constraint-guided test range synthesis and annotation propagation")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// JSON array of extra target functions; entries replace built-ins with the same id
    #[arg(long, global = true)]
    pub(crate) catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List the target functions in the catalog
    Targets {
        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Synthesize annotation documents for every (target, pattern, delta)
    Synthesize {
        /// Target id (repeatable; default: every catalog entry)
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Pattern: overlap | disjoint (repeatable)
        #[arg(long = "pattern")]
        patterns: Vec<String>,

        /// Spread (repeatable)
        #[arg(long = "delta")]
        deltas: Vec<u32>,

        /// Maximum feasibility checks per configuration
        #[arg(long)]
        max_tries: Option<u32>,

        /// Line of the BEGIN record
        #[arg(long, allow_hyphen_values = true)]
        start_line: Option<i64>,

        /// Worker threads, each with its own solver
        #[arg(long)]
        workers: Option<usize>,

        /// Per-check solver timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// JSON batch configuration; flags override its fields
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for `{id}_{pattern}_{delta}.json`
        #[arg(long)]
        out: PathBuf,

        /// Also write the SMT-LIB2 model of each accepted configuration here
        #[arg(long)]
        dump_smt: Option<PathBuf>,

        /// Write a JSON summary of generated files and failures
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run the widening search for one configuration and show every attempt
    Check {
        /// Target id
        #[arg(long)]
        target: String,

        /// Pattern: overlap | disjoint
        #[arg(long, default_value = "overlap")]
        pattern: String,

        /// Spread
        #[arg(long, default_value_t = 1)]
        delta: u32,

        /// Maximum feasibility checks
        #[arg(long, default_value_t = DEFAULT_MAX_TRIES)]
        max_tries: u32,

        /// Per-check solver timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Write the SMT-LIB2 model of the accepted ranges to this file
        #[arg(long)]
        dump_smt: Option<PathBuf>,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Build the offset table from canonical base annotations
    Offsets {
        /// Directory holding `{contract}_annot.json` files
        #[arg(long)]
        annotations: PathBuf,

        /// Contract id (repeatable; default: every `*_annot.json` file)
        #[arg(long = "contract")]
        contracts: Vec<String>,

        /// Output JSON file
        #[arg(long)]
        out: PathBuf,
    },

    /// Copy synthesized documents onto mutated contracts, re-anchored
    Propagate {
        /// Directory of mutated `.sol` files
        #[arg(long)]
        mutants: Option<PathBuf>,

        /// Mutant identifier (repeatable)
        #[arg(long = "mutant")]
        mutant_ids: Vec<String>,

        /// Directory of synthesized `{base}_{pattern}_{delta}.json` documents
        #[arg(long)]
        configs: PathBuf,

        /// Offset table produced by `offsets`
        #[arg(long)]
        offsets: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Write a JSON summary of written and skipped files
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Shift every line of an annotation document
    Reanchor {
        /// Input document
        #[arg(long)]
        input: PathBuf,

        /// Line offset (may be negative)
        #[arg(long, allow_hyphen_values = true)]
        offset: i64,

        /// Output document
        #[arg(long)]
        out: PathBuf,
    },

    /// Replace the binding intervals of a base annotation document
    Rebind {
        /// Base annotation document
        #[arg(long)]
        base: PathBuf,

        /// Ranges: a JSON array of `{low, high}` or an annotation document
        #[arg(long)]
        ranges: PathBuf,

        /// Output document
        #[arg(long)]
        out: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_defaults_to_the_engine_try_budget() {
        let cli = Cli::try_parse_from(["rangesynth", "check", "--target", "Lock_c"]).unwrap();
        match cli.command {
            Commands::Check {
                max_tries,
                delta,
                pattern,
                ..
            } => {
                assert_eq!(max_tries, DEFAULT_MAX_TRIES);
                assert_eq!(delta, 1);
                assert_eq!(pattern, "overlap");
            }
            _ => panic!("expected the check subcommand"),
        }
    }

    #[test]
    fn negative_offsets_parse() {
        let cli = Cli::try_parse_from([
            "rangesynth", "reanchor", "--input", "a.json", "--offset", "-4", "--out", "b.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Reanchor { offset: -4, .. }));
    }
}
