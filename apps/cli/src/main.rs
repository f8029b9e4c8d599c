#![deny(warnings)]

//! Headless CLI for running the balance harness.
//!
//! Exit code 0 means the batch ran and passed the balance gates; 1 means
//! either a setup error or a failed balance check, so CI can gate on it.

use anyhow::{bail, Result};
use sim_balance::{render_text, run, BalanceConfig};
use sim_core::TeamId;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    config: BalanceConfig,
    strategies: Vec<String>,
    json: bool,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut config = BalanceConfig::default();
    let mut strategies = vec![
        "balanced".to_string(),
        "volume".to_string(),
        "premium".to_string(),
        "innovator".to_string(),
    ];
    let mut json = false;
    let mut version = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--sims" => {
                config.simulations = it
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| anyhow::anyhow!("--sims needs a positive integer"))?;
            }
            "--rounds" => {
                config.rounds = it
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| anyhow::anyhow!("--rounds needs a positive integer"))?;
            }
            "--strategies" => {
                let list = it
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--strategies needs a comma-separated list"))?;
                strategies = list.split(',').map(|s| s.trim().to_string()).collect();
            }
            "--seed" => config.base_seed = it.next(),
            "--volatility" => {
                config.market_volatility = it
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| anyhow::anyhow!("--volatility needs a number"))?;
            }
            "--no-rubber-band" => config.rubber_banding = false,
            "--json" => json = true,
            "--verbose" => config.verbose = true,
            "--version" => version = true,
            other => bail!("unknown argument: {other} (see --help in README)"),
        }
    }
    // One team per strategy entry; repeat a name to field it twice.
    config.teams = strategies.len();
    Ok(Args {
        config,
        strategies,
        json,
        version,
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    if args.version {
        println!(
            "phone-tycoon {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }

    let assignments: Vec<(TeamId, String)> = args
        .strategies
        .iter()
        .enumerate()
        .map(|(i, name)| (TeamId(i as u32), name.clone()))
        .collect();
    info!(
        sims = args.config.simulations,
        rounds = args.config.rounds,
        strategies = ?args.strategies,
        "starting balance harness"
    );

    let output = run(&args.config, &assignments)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!(
            "{}",
            render_text(&output.metrics, &output.diversity, &output.report)
        );
    }

    if !output.report.passed {
        std::process::exit(1);
    }
    Ok(())
}
