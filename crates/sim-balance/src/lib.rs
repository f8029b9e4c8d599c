#![deny(warnings)]

//! Monte Carlo balance harness.
//!
//! Plays the simulation engine thousands of times with scripted strategy
//! archetypes, aggregates per-run outcomes, and gates on balance defects:
//! dominant strategies, non-viable strategies, excessive bankruptcy, low
//! outcome diversity and runaway revenue spreads. Runs are self-contained
//! and seeded, so the batch executes in parallel with no shared mutable
//! state and reproduces bit-identically for a fixed base seed.

mod harness;
mod metrics;
mod report;

pub use harness::{
    run, BalanceConfig, HarnessError, HarnessOutput, RoundRecord, SimulationRun,
    TeamResult, TeamRoundSnapshot,
};
pub use metrics::{compute_diversity, compute_metrics, BalanceMetrics, DiversityIndex};
pub use report::{evaluate, render_text, BalanceReport};
