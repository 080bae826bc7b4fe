#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that tracks a bunch through a linear ring with
//! intra-beam scattering kicks.

mod scenario;
mod tracking;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use ibs_kick_beam::ExecutionContext;

use crate::{scenario::Scenario, tracking::Summary};

#[derive(Parser, Debug)]
#[command(
    name = "ibs-kick",
    about = "Tracks a Gaussian bunch through a linear ring with intra-beam scattering kicks"
)]
struct Args {
    /// Scenario file, looked up under the bundled `scenarios/` directory when
    /// it does not exist as given.
    #[arg(default_value = "sps_flat_bottom.json")]
    scenario: PathBuf,
    /// Overrides the number of turns of the scenario.
    #[arg(long)]
    turns: Option<u64>,
    /// Overrides the random seed of the scenario.
    #[arg(long)]
    seed: Option<u64>,
    /// Uses the sequential backend even when the parallel one is available.
    #[arg(long)]
    sequential: bool,
    /// Prints one JSON object per report instead of a table.
    #[arg(long)]
    json: bool,
}

fn scenario_path(requested: &Path) -> PathBuf {
    if requested.exists() {
        return requested.to_path_buf();
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(requested)
}

#[cfg(feature = "parallel")]
fn execution_context(seed: u64, sequential: bool) -> ExecutionContext {
    if sequential {
        ExecutionContext::cpu(seed)
    } else {
        ExecutionContext::parallel(seed)
    }
}

#[cfg(not(feature = "parallel"))]
fn execution_context(seed: u64, _sequential: bool) -> ExecutionContext {
    ExecutionContext::cpu(seed)
}

fn print_summary(summary: &Summary, json: bool) -> Result<()> {
    if json {
        for report in &summary.reports {
            println!(
                "{}",
                serde_json::to_string(report).context("failed to encode report")?
            );
        }
        return Ok(());
    }
    println!(
        "{:>8} {:>14} {:>14} {:>14} {:>14}",
        "turn", "nemitt_x [m]", "nemitt_y [m]", "sigma_delta", "sigma_z [m]"
    );
    for report in &summary.reports {
        println!(
            "{:>8} {:>14.6e} {:>14.6e} {:>14.6e} {:>14.6e}",
            report.turn,
            report.nemitt_x,
            report.nemitt_y,
            report.sigma_delta,
            report.bunch_length
        );
    }
    println!(
        "coefficients recomputed {} times, {} growth rates clamped",
        summary.recomputations, summary.clamped
    );
    Ok(())
}

/// Entry point for the IBS kick command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let path = scenario_path(&args.scenario);
    let scenario = Scenario::load(&path)?;
    let seed = args.seed.unwrap_or(scenario.seed);
    let turns = args.turns.unwrap_or(scenario.turns);
    let context = execution_context(seed, args.sequential);
    log::info!(
        "loaded {} with seed {seed} on the {} backend",
        path.display(),
        context.ops().name()
    );

    let summary = tracking::run(&scenario, context, turns)?;
    print_summary(&summary, args.json)
}
