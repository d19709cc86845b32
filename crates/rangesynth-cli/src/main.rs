#![doc = include_str!("../README.md")]

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = commands::helpers::load_catalog(cli.catalog.as_deref())?;

    match cli.command {
        Commands::Targets { format } => {
            commands::targets::run_targets_command(&catalog, &format)?;
        }
        Commands::Synthesize {
            targets,
            patterns,
            deltas,
            max_tries,
            start_line,
            workers,
            timeout,
            config,
            out,
            dump_smt,
            report,
        } => {
            let overrides = commands::synthesize::SynthesizeOverrides {
                targets,
                patterns,
                deltas,
                max_tries,
                start_line,
                workers,
                timeout,
            };
            commands::synthesize::run_synthesize_command(
                &catalog,
                config.as_deref(),
                overrides,
                &out,
                dump_smt.as_deref(),
                report.as_deref(),
            )?;
        }
        Commands::Check {
            target,
            pattern,
            delta,
            max_tries,
            timeout,
            dump_smt,
            format,
        } => {
            commands::check::run_check_command(
                &catalog,
                &target,
                &pattern,
                delta,
                max_tries,
                timeout,
                dump_smt.as_deref(),
                &format,
            )?;
        }
        Commands::Offsets {
            annotations,
            contracts,
            out,
        } => {
            commands::offsets::run_offsets_command(&annotations, &contracts, &out)?;
        }
        Commands::Propagate {
            mutants,
            mutant_ids,
            configs,
            offsets,
            out,
            report,
        } => {
            commands::propagate::run_propagate_command(
                &catalog,
                mutants.as_deref(),
                mutant_ids,
                &configs,
                &offsets,
                &out,
                report.as_deref(),
            )?;
        }
        Commands::Reanchor { input, offset, out } => {
            commands::reanchor::run_reanchor_command(&input, offset, &out)?;
        }
        Commands::Rebind { base, ranges, out } => {
            commands::rebind::run_rebind_command(&base, &ranges, &out)?;
        }
    }

    Ok(())
}
